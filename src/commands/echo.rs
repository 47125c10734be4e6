use clap::Args;
use serde::Serialize;

use shipwright::context::{ContextSnapshot, OverlayLoad};

use super::CmdResult;

#[derive(Args)]
pub struct EchoArgs {}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EchoOutput {
    pub context: ContextSnapshot,
    pub overlays: Vec<OverlayLoad>,
}

/// Resolved context as JSON. Runs nothing.
pub fn run(_args: EchoArgs, global: &crate::commands::GlobalArgs) -> CmdResult<EchoOutput> {
    let (ctx, overlays) = global.context()?;
    Ok((
        EchoOutput {
            context: ctx.snapshot(),
            overlays,
        },
        0,
    ))
}
