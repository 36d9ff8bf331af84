use std::error::Error;
use std::fmt;
use std::process::Command;

use serde_json::Value;

/// Per-request budget for backend calls. The UI treats anything slower
/// than this as an unavailable backend and falls back to the cache.
pub const DEFAULT_TIMEOUT_SECS: f64 = 2.5;

// curl exit codes that mean "could not reach the host at all".
const CURL_RESOLVE_FAILED: i32 = 6;
const CURL_CONNECT_FAILED: i32 = 7;
const CURL_TIMED_OUT: i32 = 28;

#[derive(Debug, Clone, PartialEq)]
pub struct BackendConfig {
    pub url: String,
    pub api_key: String,
    pub timeout_secs: f64,
}

impl BackendConfig {
    pub fn new(url: &str, api_key: &str) -> Self {
        Self {
            url: url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.url, table)
    }
}

/// Table-based client for the hosted backend: select/insert/update/
/// delete per table, PostgREST conventions, one `curl` subprocess per
/// request with a hard timeout.
#[derive(Debug, Clone)]
pub struct RemoteStore {
    config: BackendConfig,
}

impl RemoteStore {
    pub fn new(config: BackendConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &BackendConfig {
        &self.config
    }

    /// Fetch every row of one table.
    pub fn select_all(&self, table: &str) -> Result<Vec<Value>, BackendError> {
        let url = format!("{}?select=*", self.config.table_url(table));
        let body = self.run_curl("GET", &url, None)?;
        let value: Value = serde_json::from_str(&body).map_err(|err| BackendError::InvalidJson {
            table: table.to_string(),
            message: err.to_string(),
        })?;
        match value {
            Value::Array(rows) => Ok(rows),
            _ => Err(BackendError::InvalidJson {
                table: table.to_string(),
                message: "expected a JSON array of rows".to_string(),
            }),
        }
    }

    /// Insert-or-update by primary key, used when pushing dirty rows.
    pub fn upsert(&self, table: &str, row: &Value) -> Result<(), BackendError> {
        let url = format!("{}?on_conflict=id", self.config.table_url(table));
        self.run_curl_with_prefer("POST", &url, Some(row), "resolution=merge-duplicates")?;
        Ok(())
    }

    pub fn delete(&self, table: &str, id: &str) -> Result<(), BackendError> {
        let url = format!("{}?id=eq.{}", self.config.table_url(table), id);
        self.run_curl("DELETE", &url, None)?;
        Ok(())
    }

    /// Cheap reachability probe for diagnostics.
    pub fn probe(&self) -> Result<(), BackendError> {
        let url = format!("{}/rest/v1/", self.config.url);
        self.run_curl("HEAD", &url, None)?;
        Ok(())
    }

    fn run_curl(
        &self,
        method: &str,
        url: &str,
        body: Option<&Value>,
    ) -> Result<String, BackendError> {
        self.run_curl_with_prefer(method, url, body, "return=minimal")
    }

    fn run_curl_with_prefer(
        &self,
        method: &str,
        url: &str,
        body: Option<&Value>,
        prefer: &str,
    ) -> Result<String, BackendError> {
        let mut args = vec![
            "-sS".to_string(),
            "--max-time".to_string(),
            format!("{}", self.config.timeout_secs),
            "-w".to_string(),
            "\n%{http_code}".to_string(),
            "-H".to_string(),
            format!("apikey: {}", self.config.api_key),
            "-H".to_string(),
            format!("Authorization: Bearer {}", self.config.api_key),
        ];
        match method {
            "GET" => {}
            "HEAD" => args.push("-I".to_string()),
            _ => {
                args.push("-X".to_string());
                args.push(method.to_string());
            }
        }
        if let Some(payload) = body {
            args.push("-H".to_string());
            args.push("Content-Type: application/json".to_string());
            args.push("-H".to_string());
            args.push(format!("Prefer: {prefer}"));
            args.push("--data-binary".to_string());
            args.push(payload.to_string());
        }
        args.push(url.to_string());

        let output = Command::new("curl")
            .args(&args)
            .output()
            .map_err(|err| match err.kind() {
                std::io::ErrorKind::NotFound => BackendError::CurlUnavailable,
                _ => BackendError::Io(err),
            })?;

        if !output.status.success() {
            return Err(BackendError::CommandFailed {
                command: format!("curl {method} {url}"),
                code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let (body, status) = split_status(&stdout)?;
        if !(200..300).contains(&status) {
            return Err(BackendError::Http {
                status,
                body: body.trim().to_string(),
            });
        }
        Ok(body)
    }
}

// The status code is appended by `-w` as a final line after the body.
fn split_status(stdout: &str) -> Result<(String, u16), BackendError> {
    let Some((body, status_line)) = stdout.trim_end().rsplit_once('\n') else {
        let status = stdout.trim().parse::<u16>().ok();
        return match status {
            Some(status) => Ok((String::new(), status)),
            None => Err(BackendError::MalformedResponse),
        };
    };
    let status = status_line
        .trim()
        .parse::<u16>()
        .map_err(|_| BackendError::MalformedResponse)?;
    Ok((body.to_string(), status))
}

#[derive(Debug)]
pub enum BackendError {
    CurlUnavailable,
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },
    Http {
        status: u16,
        body: String,
    },
    InvalidJson {
        table: String,
        message: String,
    },
    MalformedResponse,
    Io(std::io::Error),
}

impl BackendError {
    /// True when the failure means "host not reachable in time" rather
    /// than a server-side rejection.
    pub fn is_unreachable(&self) -> bool {
        match self {
            BackendError::CommandFailed { code, .. } => matches!(
                code,
                None | Some(CURL_RESOLVE_FAILED) | Some(CURL_CONNECT_FAILED) | Some(CURL_TIMED_OUT)
            ),
            BackendError::CurlUnavailable => true,
            _ => false,
        }
    }
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendError::CurlUnavailable => write!(f, "curl is not available on PATH"),
            BackendError::CommandFailed {
                command,
                code,
                stderr,
            } => match code {
                Some(code) => write!(f, "{command} failed with exit code {code}: {stderr}"),
                None => write!(f, "{command} was terminated: {stderr}"),
            },
            BackendError::Http { status, body } => {
                write!(f, "backend returned HTTP {status}: {body}")
            }
            BackendError::InvalidJson { table, message } => {
                write!(f, "invalid JSON from table '{table}': {message}")
            }
            BackendError::MalformedResponse => {
                write!(f, "backend response was missing its status trailer")
            }
            BackendError::Io(err) => write!(f, "I/O error: {}", err),
        }
    }
}

impl Error for BackendError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            BackendError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<std::io::Error> for BackendError {
    fn from(value: std::io::Error) -> Self {
        BackendError::Io(value)
    }
}
