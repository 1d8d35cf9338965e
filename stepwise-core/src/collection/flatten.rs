use std::collections::BTreeSet;

use serde_json::Value as JsonValue;
use tracing::warn;

use crate::error::CollectionError;
use crate::step::{Auth, FolderPath, RequestTemplate, ScriptKind, Step};

use super::model::{AuthDoc, FullRequestDoc, ItemDoc, RequestDoc, UrlDoc};
use super::TAG_HEADER;

/// Depth-first flattening of the item tree; folders only contribute path and auth.
pub(crate) fn flatten_items(
    items: &[ItemDoc],
    root_auth: Option<&AuthDoc>,
) -> Result<Vec<Step>, CollectionError> {
    let mut steps = Vec::new();
    flatten_into(items, "", &FolderPath::root(), root_auth, &mut steps)?;
    Ok(steps)
}

fn flatten_into(
    items: &[ItemDoc],
    parent_index: &str,
    folder: &FolderPath,
    inherited_auth: Option<&AuthDoc>,
    out: &mut Vec<Step>,
) -> Result<(), CollectionError> {
    for (i, item) in items.iter().enumerate() {
        let index = if parent_index.is_empty() {
            (i + 1).to_string()
        } else {
            format!("{parent_index}.{}", i + 1)
        };
        match &item.item {
            Some(children) => {
                let auth = item.auth.as_ref().or(inherited_auth);
                flatten_into(children, &index, &folder.child(item.name.as_str()), auth, out)?;
            }
            None => out.push(build_step(item, index, folder.clone(), inherited_auth)?),
        }
    }
    Ok(())
}

fn build_step(
    item: &ItemDoc,
    index: String,
    folder: FolderPath,
    inherited_auth: Option<&AuthDoc>,
) -> Result<Step, CollectionError> {
    let request = match &item.request {
        Some(RequestDoc::Full(full)) => full.clone(),
        Some(RequestDoc::Url(url)) => FullRequestDoc {
            url: Some(UrlDoc::Raw(url.clone())),
            ..Default::default()
        },
        None => {
            return Err(CollectionError::MissingRequest {
                index,
                name: item.name.clone(),
            })
        }
    };

    let Some(url) = request
        .url
        .as_ref()
        .and_then(UrlDoc::raw)
        .map(str::trim)
        .filter(|u| !u.is_empty())
    else {
        return Err(CollectionError::MissingUrl { index });
    };
    let method = request
        .method
        .as_deref()
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .unwrap_or("GET")
        .to_uppercase();

    let mut template = RequestTemplate::new(method, url);
    let mut tags = BTreeSet::new();
    for header in request.header.iter().filter(|h| !h.disabled) {
        let key = header.key.trim();
        if key.eq_ignore_ascii_case(TAG_HEADER) {
            tags.extend(
                header
                    .value
                    .split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(String::from),
            );
            continue;
        }
        template.headers.push((key.to_string(), header.value.trim().to_string()));
    }

    template.body = request
        .body
        .as_ref()
        .filter(|b| b.mode.as_deref().map_or(true, |m| m == "raw"))
        .and_then(|b| b.raw.as_deref())
        .map(str::trim)
        .filter(|raw| !raw.is_empty())
        .map(String::from);

    // Request auth wins over folder auth, which wins over collection auth.
    let auth_doc = request.auth.as_ref().or(item.auth.as_ref()).or(inherited_auth);
    template.auth = auth_doc.and_then(|a| bearer_of(a, &index));

    let mut step = Step::new(index, item.name.clone(), template).with_folder(folder);
    step.tags = tags;
    for event in &item.event {
        let kind = match event.listen.as_str() {
            "prerequest" => ScriptKind::PreRequest,
            "test" => ScriptKind::Test,
            _ => continue,
        };
        if let Some(script) = &event.script {
            let source = script.exec.joined();
            if !source.trim().is_empty() {
                step = step.with_script(kind, source);
            }
        }
    }
    Ok(step)
}

fn bearer_of(auth: &AuthDoc, index: &str) -> Option<Auth> {
    match auth.kind.as_str() {
        "bearer" => auth
            .bearer
            .iter()
            .find(|p| p.key == "token")
            .map(|p| Auth::Bearer {
                token: match &p.value {
                    JsonValue::String(s) => s.clone(),
                    other => other.to_string(),
                },
            }),
        "noauth" => None,
        other => {
            warn!(step_index = %index, auth_type = other, "unsupported auth type ignored");
            None
        }
    }
}
