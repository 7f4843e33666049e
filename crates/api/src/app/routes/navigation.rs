use axum::{extract::Extension, Json};
use serde_json::json;

use exportdesk_auth::{authorize, Role, Session};

use crate::app::dto::NavItem;
use crate::context::SessionContext;

struct Entry {
    name: &'static str,
    href: Option<&'static str>,
    required: Option<Role>,
    children: &'static [(&'static str, &'static str)],
}

const ENTRIES: &[Entry] = &[
    Entry {
        name: "Dashboard",
        href: Some("/dashboard"),
        required: None,
        children: &[],
    },
    Entry {
        name: "Manage Data",
        href: None,
        required: None,
        children: &[
            ("Shipper", "/dashboard/shippers"),
            ("Consignee", "/dashboard/consignees"),
            ("Container", "/dashboard/containers"),
            ("Notify Party", "/dashboard/notify-parties"),
        ],
    },
    Entry {
        name: "Manage User",
        href: Some("/dashboard/users"),
        required: Some(Role::Admin),
        children: &[],
    },
];

/// Sidebar entries the session may open.
pub fn visible_items(session: &Session) -> Vec<NavItem> {
    ENTRIES
        .iter()
        .filter(|entry| authorize(session, entry.required).is_allowed())
        .map(|entry| NavItem {
            name: entry.name,
            href: entry.href,
            children: entry
                .children
                .iter()
                .map(|&(name, href)| NavItem {
                    name,
                    href: Some(href),
                    children: Vec::new(),
                })
                .collect(),
        })
        .collect()
}

pub async fn entries(Extension(context): Extension<SessionContext>) -> Json<serde_json::Value> {
    let session = context.session();
    let user = session.profile().map(|p| {
        json!({
            "email": p.email,
            "display_name": p.display_name(),
            "role": p.role,
        })
    });
    Json(json!({
        "user": user,
        "items": visible_items(session),
    }))
}
