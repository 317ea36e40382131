use anyhow::{anyhow, bail, Result};
use aws_sdk_ec2::types::Instance;

use crate::ec2;

/// Placeholder rendered when an instance lacks the requested address.
pub const MISSING: &str = "<no value>";

pub type Formatter = fn(&Instance) -> String;

/// Display formatters by key, usable with `ls --formatter` and as `{key}`
/// placeholders in custom format templates.
pub const FORMATTERS: [(&str, Formatter); 5] = [
    ("name", name),
    ("public_ip", public_ip),
    ("private_ip", private_ip),
    ("extended_public", extended_public),
    ("extended_private", extended_private),
];

pub fn name(instance: &Instance) -> String {
    ec2::name(instance)
}

pub fn public_ip(instance: &Instance) -> String {
    ec2::public_ip(instance).unwrap_or(MISSING).to_string()
}

pub fn private_ip(instance: &Instance) -> String {
    ec2::private_ip(instance).unwrap_or(MISSING).to_string()
}

pub fn extended_public(instance: &Instance) -> String {
    format!(
        "{} ({})",
        ec2::name(instance),
        ec2::public_ip(instance).unwrap_or(MISSING)
    )
}

pub fn extended_private(instance: &Instance) -> String {
    format!(
        "{} ({})",
        ec2::name(instance),
        ec2::private_ip(instance).unwrap_or(MISSING)
    )
}

pub fn lookup(key: &str) -> Option<Formatter> {
    FORMATTERS
        .iter()
        .find(|(k, _)| *k == key)
        .map(|(_, f)| *f)
}

/// Renders a custom format template against one instance. Each `{key}`
/// placeholder must name a registered formatter; anything else in the
/// template is copied through verbatim.
pub fn render_template(template: &str, instance: &Instance) -> Result<String> {
    let mut rendered = String::with_capacity(template.len());
    let mut remainder = template;

    while let Some(start) = remainder.find('{') {
        rendered.push_str(&remainder[..start]);
        let after = &remainder[start + 1..];
        let Some(end) = after.find('}') else {
            bail!("unclosed placeholder in format template: {template:?}");
        };
        let key = &after[..end];
        let formatter =
            lookup(key).ok_or_else(|| anyhow!("unknown placeholder in format template: {{{key}}}"))?;
        rendered.push_str(&formatter(instance));
        remainder = &after[end + 1..];
    }

    rendered.push_str(remainder);
    Ok(rendered)
}
