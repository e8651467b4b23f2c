pub mod config;
pub mod doctor;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

impl CommandResult {
    pub fn ok(output: String) -> Self {
        Self { exit_code: 0, output }
    }

    pub fn failed(exit_code: u8, output: String) -> Self {
        Self { exit_code, output }
    }
}
