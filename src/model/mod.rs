pub mod config;
pub mod installer_form;
pub mod mode;
