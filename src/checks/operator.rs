//! Operator-level checks

use anyhow::Result;

use crate::checks::{Check, Findings};
use crate::model::Operator;

pub fn checks() -> Vec<Check> {
    vec![Check::operator(
        "check_upgrade",
        "Validate upgrade graphs for all channels",
        check_upgrade,
    )]
}

/// Every bundle of a channel, except its head, must be upgradable to another
/// bundle of the channel
pub fn check_upgrade(operator: &Operator, findings: &mut Findings) -> Result<()> {
    let mut channels = operator.channels()?;
    if let Some(default_channel) = operator.default_channel()? {
        channels.insert(default_channel);
    }
    for channel in &channels {
        if let Err(err) = check_channel(operator, channel, findings) {
            findings.fail(err.to_string());
        }
    }
    Ok(())
}

fn check_channel(
    operator: &Operator,
    channel: &str,
    findings: &mut Findings,
) -> crate::error::Result<()> {
    let bundles = operator.channel_bundles(channel)?;
    let head = operator.head(channel)?;
    let graph = operator.update_graph(channel)?;

    let mut dangling: Vec<String> = bundles
        .iter()
        .filter(|bundle| !graph.contains_key(*bundle) && **bundle != head)
        .map(ToString::to_string)
        .collect();
    if !dangling.is_empty() {
        dangling.sort();
        dangling.dedup();
        findings.fail(format!(
            "Channel {} has dangling bundles: {{{}}}",
            channel,
            dangling.join(", ")
        ));
    }
    Ok(())
}
