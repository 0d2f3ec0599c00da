use crate::plugin::descriptor::{MenuPosition, PluginCandidate};

const KINDS: [&str; 3] = ["editor", "menu", "validator"];

/// Field focus within the installer form.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormField {
    #[default]
    Name,
    Kind,
    Position,
    RequireDoc,
    Src,
}

/// State of the add-plugin form.
#[derive(Debug, Clone)]
pub struct InstallerForm {
    pub name: String,
    pub src: String,
    kind: usize,
    pub position: MenuPosition,
    pub require_doc: bool,
    pub focus: FormField,
    pub error: Option<String>,
}

impl Default for InstallerForm {
    fn default() -> Self {
        Self {
            name: String::new(),
            src: String::new(),
            kind: 0,
            position: MenuPosition::Middle,
            require_doc: true,
            focus: FormField::Name,
            error: None,
        }
    }
}

impl InstallerForm {
    pub fn kind(&self) -> &'static str {
        KINDS[self.kind]
    }

    pub fn is_menu(&self) -> bool {
        self.kind() == "menu"
    }

    /// Fields shown for the current kind, in focus order.
    pub fn fields(&self) -> Vec<FormField> {
        if self.is_menu() {
            vec![
                FormField::Name,
                FormField::Kind,
                FormField::Position,
                FormField::RequireDoc,
                FormField::Src,
            ]
        } else {
            vec![FormField::Name, FormField::Kind, FormField::Src]
        }
    }

    pub fn focus_next(&mut self) {
        self.move_focus(1);
    }

    pub fn focus_prev(&mut self) {
        self.move_focus(-1);
    }

    fn move_focus(&mut self, delta: isize) {
        let fields = self.fields();
        let current = fields.iter().position(|f| *f == self.focus).unwrap_or(0) as isize;
        let len = fields.len() as isize;
        self.focus = fields[(current + delta).rem_euclid(len) as usize];
    }

    pub fn push_char(&mut self, ch: char) {
        match self.focus {
            FormField::Name => self.name.push(ch),
            FormField::Src => self.src.push(ch),
            _ => return,
        }
        self.error = None;
    }

    pub fn pop_char(&mut self) {
        match self.focus {
            FormField::Name => {
                self.name.pop();
            }
            FormField::Src => {
                self.src.pop();
            }
            _ => {}
        }
    }

    /// Cycles or toggles the focused choice field.
    pub fn cycle(&mut self) {
        match self.focus {
            FormField::Kind => self.kind = (self.kind + 1) % KINDS.len(),
            FormField::Position => {
                let idx = MenuPosition::ALL
                    .iter()
                    .position(|p| *p == self.position)
                    .unwrap_or(0);
                self.position = MenuPosition::ALL[(idx + 1) % MenuPosition::ALL.len()];
            }
            FormField::RequireDoc => self.require_doc = !self.require_doc,
            FormField::Name | FormField::Src => {}
        }
    }

    /// Candidate for an add request. Menu options are only sent for menu plugins.
    pub fn to_candidate(&self) -> PluginCandidate {
        let candidate = PluginCandidate::new(self.name.clone(), self.src.clone(), self.kind());
        if self.is_menu() {
            candidate
                .with_position(self.position.label())
                .with_require_doc(self.require_doc)
        } else {
            candidate
        }
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_editor_kind() {
        let form = InstallerForm::default();
        assert_eq!(form.kind(), "editor");
        assert_eq!(form.fields().len(), 3);
    }

    #[test]
    fn typing_goes_to_focused_text_field() {
        let mut form = InstallerForm::default();
        "abc".chars().for_each(|ch| form.push_char(ch));
        form.pop_char();

        form.focus_prev();
        assert_eq!(form.focus, FormField::Src);
        "http".chars().for_each(|ch| form.push_char(ch));

        assert_eq!(form.name, "ab");
        assert_eq!(form.src, "http");
    }

    #[test]
    fn menu_kind_exposes_menu_fields() {
        let mut form = InstallerForm::default();
        form.focus_next();
        assert_eq!(form.focus, FormField::Kind);
        form.cycle();
        assert!(form.is_menu());

        form.focus_next();
        assert_eq!(form.focus, FormField::Position);
        form.cycle();
        assert_eq!(form.position, MenuPosition::Bottom);

        form.focus_next();
        form.cycle();
        assert!(!form.require_doc);

        let candidate = form.to_candidate();
        assert_eq!(candidate.kind.as_deref(), Some("menu"));
        assert_eq!(candidate.position.as_deref(), Some("bottom"));
        assert_eq!(candidate.require_doc, Some(false));
    }

    #[test]
    fn non_menu_candidate_has_no_menu_options() {
        let mut form = InstallerForm::default();
        form.focus = FormField::Kind;
        form.cycle();
        form.cycle();
        assert_eq!(form.kind(), "validator");

        let candidate = form.to_candidate();
        assert!(candidate.position.is_none());
        assert!(candidate.require_doc.is_none());
    }

    #[test]
    fn clear_restores_defaults() {
        let mut form = InstallerForm::default();
        form.push_char('x');
        form.error = Some("bad".to_string());
        form.clear();

        assert!(form.name.is_empty());
        assert!(form.error.is_none());
        assert_eq!(form.focus, FormField::Name);
    }
}
