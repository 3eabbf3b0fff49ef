/// Path to send unauthenticated users to.
pub const LOGIN_PATH: &str = "/login";

/// Where an already-logged-in user lands.
pub const APPLICATION_PATH: &str = "/app/dashboards";

const PUBLIC_PATHS: &[&str] = &[
    "/",
    LOGIN_PATH,
    "/verify/resend",
    "/password/forgot",
    "/password/reset",
    "/verify/email",
];

// these flows carry a one-time token in the path
const PUBLIC_PREFIXES: &[&str] = &["/verify/email", "/password/reset"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteKind {
    Public,
    Private,
}

/// Static split of the path space into public and private routes.
#[derive(Debug, Clone)]
pub struct RouteClassifier {
    public_paths: Vec<String>,
    public_prefixes: Vec<String>,
}

impl Default for RouteClassifier {
    fn default() -> Self {
        Self::new(
            PUBLIC_PATHS.iter().map(|p| p.to_string()).collect(),
            PUBLIC_PREFIXES.iter().map(|p| p.to_string()).collect(),
        )
    }
}

impl RouteClassifier {
    pub fn new(public_paths: Vec<String>, public_prefixes: Vec<String>) -> Self {
        Self {
            public_paths: public_paths.iter().map(|p| normalize(p).to_string()).collect(),
            public_prefixes: public_prefixes
                .iter()
                .map(|p| normalize(p).to_string())
                .collect(),
        }
    }

    pub fn classify(&self, path: &str) -> RouteKind {
        if self.is_public(path) {
            RouteKind::Public
        } else {
            RouteKind::Private
        }
    }

    pub fn is_public(&self, path: &str) -> bool {
        let path = normalize(path);

        self.public_paths.iter().any(|p| p == path)
            || self.public_prefixes.iter().any(|prefix| {
                path.strip_prefix(prefix.as_str())
                    .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
            })
    }
}

/// Strip trailing slashes; the empty path and "/" both mean the root.
fn normalize(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() { "/" } else { trimmed }
}
