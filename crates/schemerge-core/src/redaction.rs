use serde::{Deserialize, Serialize};

/// Connection metadata with secrets redacted.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RedactedConnection {
    pub engine: Option<String>,
    pub user: Option<String>,
    pub host: Option<String>,
    pub port: Option<u16>,
    pub database: Option<String>,
    pub redacted: String,
}

impl RedactedConnection {
    /// Short endpoint identity for logs and artifact headers, e.g.
    /// `app@db.internal:5432/crm`.
    pub fn identity(&self) -> String {
        let mut out = String::new();
        if let Some(user) = &self.user {
            out.push_str(user);
            out.push('@');
        }
        out.push_str(self.host.as_deref().unwrap_or("localhost"));
        if let Some(port) = self.port {
            out.push_str(&format!(":{port}"));
        }
        if let Some(database) = &self.database {
            out.push('/');
            out.push_str(database);
        }
        out
    }
}

/// Redact secrets from a connection URL while extracting non-sensitive metadata.
pub fn redact_connection_string(conn: &str) -> RedactedConnection {
    let Some((scheme, rest)) = conn.split_once("://") else {
        return RedactedConnection {
            redacted: redact_query_params(conn),
            ..RedactedConnection::default()
        };
    };

    let (authority_and_path, query) = match rest.split_once('?') {
        Some((head, query)) => (head, Some(query)),
        None => (rest, None),
    };
    let (authority, path) = authority_and_path
        .split_once('/')
        .unwrap_or((authority_and_path, ""));
    let (auth, host_port) = match authority.rsplit_once('@') {
        Some((auth, host_port)) => (Some(auth), host_port),
        None => (None, authority),
    };

    let (user, safe_auth) = match auth {
        Some(auth) => match auth.split_once(':') {
            Some((user, _password)) => (Some(user.to_string()), format!("{user}:***@")),
            None => (Some(auth.to_string()), format!("{auth}@")),
        },
        None => (None, String::new()),
    };

    let (host, port) = match host_port.rsplit_once(':') {
        Some((host, port)) => (host.to_string(), port.parse::<u16>().ok()),
        None => (host_port.to_string(), None),
    };

    let mut redacted = format!("{scheme}://{safe_auth}{host_port}");
    if !path.is_empty() {
        redacted.push('/');
        redacted.push_str(path);
    }
    if let Some(query) = query {
        redacted.push('?');
        redacted.push_str(&redact_pairs(query));
    }

    RedactedConnection {
        engine: Some(scheme.to_string()),
        user,
        host: (!host.is_empty()).then_some(host),
        port,
        database: (!path.is_empty()).then(|| path.to_string()),
        redacted,
    }
}

fn redact_query_params(conn: &str) -> String {
    match conn.split_once('?') {
        Some((base, query)) => format!("{base}?{}", redact_pairs(query)),
        None => conn.to_string(),
    }
}

fn redact_pairs(query: &str) -> String {
    query
        .split('&')
        .map(|pair| match pair.split_once('=') {
            Some((key, _)) if is_sensitive_key(key) => format!("{key}=***"),
            _ => pair.to_string(),
        })
        .collect::<Vec<_>>()
        .join("&")
}

fn is_sensitive_key(key: &str) -> bool {
    matches!(
        key.to_lowercase().as_str(),
        "password" | "pass" | "token" | "api_key" | "apikey" | "sslpassword"
    )
}
