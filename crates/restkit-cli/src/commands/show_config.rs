use crate::error::CliResult;
use restkit_config::ClientSettings;

pub struct ShowConfigCommand;

impl ShowConfigCommand {
    pub fn run(settings: &ClientSettings, json: bool) -> CliResult<()> {
        println!("{}", Self::render(settings, json)?);
        Ok(())
    }

    pub fn render(settings: &ClientSettings, json: bool) -> CliResult<String> {
        if json {
            Ok(serde_json::to_string_pretty(settings)?)
        } else {
            Ok(serde_yaml::to_string(settings)?)
        }
    }
}
