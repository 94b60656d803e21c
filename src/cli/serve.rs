//! `taskdeck serve`: run the reference notification endpoint.

use serde::Serialize;

use crate::cli::{load_context, GlobalArgs};
use crate::error::Result;
use crate::output::{emit_success, HumanOutput};
use crate::server::{self, NOTIFY_PATH};

#[derive(Serialize)]
struct ServeReport {
    bind: String,
    path: &'static str,
}

pub async fn run(bind: Option<String>, global: GlobalArgs) -> Result<()> {
    let ctx = load_context(global)?;
    let bind = bind
        .filter(|addr| !addr.trim().is_empty())
        .unwrap_or_else(|| ctx.config.server.bind.clone());

    let report = ServeReport {
        bind: bind.clone(),
        path: NOTIFY_PATH,
    };
    let mut human = HumanOutput::new(format!("Serving http://{bind}{NOTIFY_PATH}"));
    human.push_next_step("press ctrl-c to stop");
    emit_success(ctx.output, "serve", &report, Some(&human))?;

    server::serve(&bind).await
}
