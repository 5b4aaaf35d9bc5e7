//! View gates.
//!
//! Each gate is a pure function of the current identity and the requested
//! path. All role checks go through [`is_admin`], so the route-level admin
//! gate and the path-prefix check in [`project`] cannot drift apart.

use crate::models::{Identity, Role};

pub const PUBLIC_ENTRY: &str = "/";
pub const DEFAULT_DASHBOARD: &str = "/dashboard";
pub const ADMIN_PREFIX: &str = "/dashboard/admin";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Redirect(&'static str),
}

pub fn is_admin(identity: Option<&Identity>) -> bool {
    identity.is_some_and(|i| i.role == Role::Admin)
}

/// Public entry page: only for visitors without a session.
pub fn guest(identity: Option<&Identity>) -> Decision {
    match identity {
        Some(_) => Decision::Redirect(DEFAULT_DASHBOARD),
        None => Decision::Allow,
    }
}

pub fn authenticated(identity: Option<&Identity>) -> Decision {
    match identity {
        Some(_) => Decision::Allow,
        None => Decision::Redirect(PUBLIC_ENTRY),
    }
}

pub fn admin(identity: Option<&Identity>) -> Decision {
    if is_admin(identity) {
        Decision::Allow
    } else {
        Decision::Redirect(DEFAULT_DASHBOARD)
    }
}

/// Gate over the whole dashboard subtree, re-checking admin paths itself.
pub fn project(identity: Option<&Identity>, path: &str) -> Decision {
    if let redirect @ Decision::Redirect(_) = authenticated(identity) {
        return redirect;
    }
    if path.starts_with(ADMIN_PREFIX) && !is_admin(identity) {
        return Decision::Redirect(DEFAULT_DASHBOARD);
    }
    Decision::Allow
}
