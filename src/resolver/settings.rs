//! `<localRepository>` extraction from Maven `settings.xml` files.

use std::path::PathBuf;
use std::sync::LazyLock;

use regex::Regex;

use crate::resolver::ambient::Ambient;

static PROPERTY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]*)\}").expect("static property regex"));

/// Extract the configured local repository from settings XML text.
///
/// The first `localRepository` element with non-blank text wins; commented
/// out examples are not elements and never match. Returns `Err` with a short
/// reason when the document is malformed, has no usable element, or
/// references a property that cannot be expanded.
pub fn local_repository(xml: &str, ambient: &dyn Ambient) -> Result<PathBuf, String> {
    let doc = roxmltree::Document::parse(xml).map_err(|e| format!("malformed settings: {e}"))?;

    let raw = doc
        .descendants()
        .filter(|node| node.has_tag_name("localRepository"))
        .filter_map(|node| node.text())
        .map(str::trim)
        .find(|text| !text.is_empty())
        .ok_or_else(|| "no <localRepository> element".to_string())?;

    let expanded = expand_properties(raw, ambient)?;
    Ok(PathBuf::from(expanded))
}

/// Expand `${user.home}` and `${env.NAME}` the way Maven does.
fn expand_properties(value: &str, ambient: &dyn Ambient) -> Result<String, String> {
    let mut out = String::with_capacity(value.len());
    let mut last = 0;
    for caps in PROPERTY.captures_iter(value) {
        let (Some(whole), Some(key)) = (caps.get(0), caps.get(1)) else {
            continue;
        };
        out.push_str(&value[last..whole.start()]);
        let key = key.as_str();
        let replacement = if key == "user.home" {
            ambient
                .home_dir()
                .map(|h| h.to_string_lossy().into_owned())
        } else if let Some(name) = key.strip_prefix("env.") {
            ambient.env_var(name)
        } else {
            None
        };
        match replacement {
            Some(r) => out.push_str(&r),
            None => return Err(format!("unresolved property ${{{key}}}")),
        }
        last = whole.end();
    }
    out.push_str(&value[last..]);
    Ok(out)
}
