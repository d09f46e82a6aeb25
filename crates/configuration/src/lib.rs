pub mod configuration;
pub mod environment;
pub mod error;
pub mod to_runtime_configuration;
pub mod values;
pub mod version1;

pub use configuration::{Configuration, LlmConnection, ODataConnection};
pub use values::{RetrySettings, Secret};
pub use version1::{
    parse_configuration, write_parsed_configuration, LlmSettings, ODataSettings,
    ParsedConfiguration,
};

pub use to_runtime_configuration::make_runtime_configuration;
