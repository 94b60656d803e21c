//! Notification settings and `notify test`.

use serde::Serialize;

use crate::cli::{describe_delivery, load_context, GlobalArgs};
use crate::error::Result;
use crate::model::NotificationSettings;
use crate::notify::{Channel, Delivery};
use crate::output::{emit_success, HumanOutput};

pub struct SetOptions {
    pub email: Option<String>,
    pub slack: Option<String>,
    pub global: GlobalArgs,
}

pub struct NotifyTestOptions {
    pub channel: Channel,
    pub to: Option<String>,
    pub subject: String,
    pub message: String,
    pub global: GlobalArgs,
}

#[derive(Serialize)]
struct SettingsReport {
    stored: NotificationSettings,
    effective: NotificationSettings,
    #[serde(skip_serializing_if = "Option::is_none")]
    endpoint: Option<String>,
}

pub fn run_show(global: GlobalArgs) -> Result<()> {
    let ctx = load_context(global)?;
    let (board, warnings) = ctx.open_board();
    let notifier = ctx.notifier(board.settings());

    let report = SettingsReport {
        stored: board.settings().clone(),
        effective: notifier.targets().clone(),
        endpoint: notifier.endpoint().map(str::to_string),
    };
    let mut human = HumanOutput::new("Notification settings");
    human.extend_warnings(warnings);
    push_settings_summary(&mut human, &report);
    if report.endpoint.is_none() {
        human.push_next_step("set [notify] endpoint in .taskdeck.toml to deliver notifications");
    }
    emit_success(ctx.output, "settings show", &report, Some(&human))
}

pub fn run_set(options: SetOptions) -> Result<()> {
    let ctx = load_context(options.global)?;
    let (mut board, warnings) = ctx.open_board();

    let mut next = board.settings().clone();
    if let Some(email) = options.email {
        next.default_email = Some(email);
    }
    if let Some(slack) = options.slack {
        next.default_slack = Some(slack);
    }
    let stored = board.update_settings(next);
    let notifier = ctx.notifier(&stored);

    let report = SettingsReport {
        effective: notifier.targets().clone(),
        endpoint: notifier.endpoint().map(str::to_string),
        stored,
    };
    let mut human = HumanOutput::new("Saved notification settings");
    human.extend_warnings(warnings);
    push_settings_summary(&mut human, &report);
    emit_success(ctx.output, "settings set", &report, Some(&human))
}

pub async fn run_notify_test(options: NotifyTestOptions) -> Result<()> {
    let ctx = load_context(options.global)?;
    let (board, warnings) = ctx.open_board();
    let notifier = ctx.notifier(board.settings());

    let delivery = notifier
        .send(
            options.channel,
            options.to.as_deref(),
            &options.subject,
            &options.message,
        )
        .await;

    let mut human = HumanOutput::new(describe_delivery(&delivery));
    human.extend_warnings(warnings);
    if let Delivery::Skipped { channel, .. } = &delivery {
        human.push_next_step(format!(
            "taskdeck settings set --{} <destination>",
            channel.as_str()
        ));
    }
    emit_success(ctx.output, "notify test", &delivery, Some(&human))
}

fn push_settings_summary(human: &mut HumanOutput, report: &SettingsReport) {
    let show = |value: &Option<String>| value.clone().unwrap_or_else(|| "(unset)".to_string());
    human.push_summary("Email", show(&report.stored.default_email));
    human.push_summary("Slack", show(&report.stored.default_slack));
    if report.effective != report.stored {
        human.push_summary("Effective email", show(&report.effective.default_email));
        human.push_summary("Effective slack", show(&report.effective.default_slack));
    }
    human.push_summary(
        "Endpoint",
        report
            .endpoint
            .clone()
            .unwrap_or_else(|| "(none, sends are simulated)".to_string()),
    );
}
