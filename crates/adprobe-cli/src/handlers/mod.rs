//! Command handlers, one module per subcommand

pub mod init;
pub mod run;
pub mod validate;
pub mod variants;

pub use init::execute_init;
pub use run::{apply_overrides, execute_run};
pub use validate::{describe_plan, execute_validate};
pub use variants::{execute_variants, render_variants};
