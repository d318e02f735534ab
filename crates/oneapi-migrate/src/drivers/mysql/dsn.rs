//! Native MySQL DSN parsing.
//!
//! Accepts the `[user[:password]@][proto[(addr)]]/dbname[?params]` grammar
//! and produces SQLx connect options.

use sqlx::mysql::{MySqlConnectOptions, MySqlSslMode};
use tracing::debug;

use crate::error::{MigrateError, Result};

const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3306;

/// Where the server listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MysqlAddress {
    Tcp { host: String, port: u16 },
    Socket(String),
}

/// A parsed native MySQL DSN.
#[derive(Clone, PartialEq, Eq)]
pub struct MysqlDsn {
    pub user: String,
    pub password: Option<String>,
    pub address: MysqlAddress,
    pub database: String,
    pub charset: Option<String>,
    pub tls: Option<String>,
}

impl std::fmt::Debug for MysqlDsn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MysqlDsn")
            .field("user", &self.user)
            .field("password", &self.password.as_ref().map(|_| "[REDACTED]"))
            .field("address", &self.address)
            .field("database", &self.database)
            .field("charset", &self.charset)
            .field("tls", &self.tls)
            .finish()
    }
}

impl MysqlDsn {
    /// Parse a native DSN.
    pub fn parse(dsn: &str) -> Result<Self> {
        // The password may contain '?' or '/', so the database is located
        // from the last '/' and parameters are only looked for after it.
        let slash = dsn
            .rfind('/')
            .ok_or_else(|| MigrateError::invalid_dsn("mysql", "missing '/' before database name"))?;
        let head = &dsn[..slash];
        let (database, params) = match dsn[slash + 1..].split_once('?') {
            Some((db, p)) => (db.to_string(), Some(p)),
            None => (dsn[slash + 1..].to_string(), None),
        };

        let (credentials, endpoint) = match head.rfind('@') {
            Some(at) => (Some(&head[..at]), &head[at + 1..]),
            None => (None, head),
        };

        let (user, password) = match credentials {
            Some(c) => match c.split_once(':') {
                Some((u, p)) => (u.to_string(), Some(p.to_string())),
                None => (c.to_string(), None),
            },
            None => (String::new(), None),
        };

        let address = parse_address(endpoint)?;

        let mut parsed = MysqlDsn {
            user,
            password,
            address,
            database,
            charset: None,
            tls: None,
        };

        for pair in params.into_iter().flat_map(|p| p.split('&')) {
            if pair.is_empty() {
                continue;
            }
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            match key {
                "charset" => {
                    // The Go driver accepts a fallback list; the first entry wins.
                    parsed.charset = value.split(',').next().map(str::to_string);
                }
                "tls" => parsed.tls = Some(value.to_string()),
                other => debug!("Ignoring MySQL DSN parameter '{}'", other),
            }
        }

        Ok(parsed)
    }

    /// SSL mode derived from the `tls` parameter.
    pub fn ssl_mode(&self) -> Result<MySqlSslMode> {
        match self.tls.as_deref() {
            None | Some("false") => Ok(MySqlSslMode::Disabled),
            Some("preferred") => Ok(MySqlSslMode::Preferred),
            Some("skip-verify") => Ok(MySqlSslMode::Required),
            Some("true") => Ok(MySqlSslMode::VerifyIdentity),
            Some(other) => Err(MigrateError::invalid_dsn(
                "mysql",
                format!(
                    "unsupported tls value '{}'. Valid values: true, false, skip-verify, preferred",
                    other
                ),
            )),
        }
    }

    /// Build SQLx connect options.
    pub fn connect_options(&self) -> Result<MySqlConnectOptions> {
        let mut options = MySqlConnectOptions::new()
            .username(&self.user)
            .ssl_mode(self.ssl_mode()?);

        options = match &self.address {
            MysqlAddress::Tcp { host, port } => options.host(host).port(*port),
            MysqlAddress::Socket(path) => options.socket(path),
        };

        if let Some(password) = &self.password {
            options = options.password(password);
        }
        if !self.database.is_empty() {
            options = options.database(&self.database);
        }
        if let Some(charset) = &self.charset {
            options = options.charset(charset);
        }

        Ok(options)
    }
}

fn parse_address(endpoint: &str) -> Result<MysqlAddress> {
    if endpoint.is_empty() {
        return Ok(MysqlAddress::Tcp {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        });
    }

    let (proto, addr) = match endpoint.split_once('(') {
        Some((proto, rest)) => {
            let addr = rest.strip_suffix(')').ok_or_else(|| {
                MigrateError::invalid_dsn("mysql", format!("unclosed address in '{}'", endpoint))
            })?;
            (proto, addr)
        }
        None => (endpoint, ""),
    };

    match proto {
        "unix" => {
            if addr.is_empty() {
                return Err(MigrateError::invalid_dsn("mysql", "unix() needs a socket path"));
            }
            Ok(MysqlAddress::Socket(addr.to_string()))
        }
        "tcp" | "" => parse_host_port(addr),
        other => Err(MigrateError::invalid_dsn(
            "mysql",
            format!("unsupported protocol '{}'", other),
        )),
    }
}

fn parse_host_port(addr: &str) -> Result<MysqlAddress> {
    if addr.is_empty() {
        return Ok(MysqlAddress::Tcp {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
        });
    }

    // Bracketed IPv6: [::1]:3306
    let (host, port) = if let Some(rest) = addr.strip_prefix('[') {
        let close = rest
            .find(']')
            .ok_or_else(|| MigrateError::invalid_dsn("mysql", "unclosed '[' in address"))?;
        let host = &rest[..close];
        let port = rest[close + 1..].strip_prefix(':');
        (host, port)
    } else {
        match addr.rsplit_once(':') {
            Some((h, p)) => (h, Some(p)),
            None => (addr, None),
        }
    };

    let port = match port {
        Some(p) => p
            .parse::<u16>()
            .map_err(|_| MigrateError::invalid_dsn("mysql", format!("invalid port '{}'", p)))?,
        None => DEFAULT_PORT,
    };

    Ok(MysqlAddress::Tcp {
        host: host.to_string(),
        port,
    })
}
