use crate::cli::{actions::Action, globals::GlobalArgs};
use crate::portero::new;
use anyhow::Result;

/// Handle the server action
pub async fn handle(action: Action, globals: &GlobalArgs) -> Result<()> {
    match action {
        Action::Server { port, dsn } => {
            new(port, dsn, globals).await?;
        }
    }

    Ok(())
}
