use crate::app_state::AppState;
use crate::commands::CommandError;
use crate::services::inventory::{fetch_inventory, render_inventory};

pub async fn run(state: &AppState) -> Result<(), CommandError> {
    let inventory = fetch_inventory(state.gemini.as_ref()).await?;
    print!("{}", render_inventory(&inventory));
    Ok(())
}
