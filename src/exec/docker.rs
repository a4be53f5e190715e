//! Running psql inside a local Postgres container when the host has no
//! psql binary.

use crate::error::{MdrunError, Result};
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::debug;

/// libpq variables forwarded into the container when they are set.
pub const FORWARDED_ENV: &[&str] = &["PGUSER", "PGPASSWORD", "PGDATABASE", "PGHOST", "PGPORT"];

/// Variables a container session cannot do without.
const REQUIRED_ENV: &[&str] = &["PGUSER", "PGDATABASE"];

/// The [`FORWARDED_ENV`] variables that are set, as read through `var`.
pub fn forwarded_env(var: impl Fn(&str) -> Option<String>) -> Vec<(&'static str, String)> {
    FORWARDED_ENV
        .iter()
        .filter_map(|name| var(name).map(|value| (*name, value)))
        .collect()
}

pub fn check_required_env(env: &[(&str, String)]) -> Result<()> {
    let missing: Vec<&str> = REQUIRED_ENV
        .iter()
        .copied()
        .filter(|required| !env.iter().any(|(name, _)| name == required))
        .collect();
    if missing.is_empty() {
        return Ok(());
    }

    Err(MdrunError::UserError(format!(
        "PostgreSQL is running in Docker but required environment variables are missing: {}\n\
         Fix: set {} before running psql blocks.",
        missing.join(", "),
        missing.join(" and ")
    )))
}

/// `docker exec` argv running `inner` inside `container` as the postgres
/// user, with `env` passed through.
pub fn exec_argv(container: &str, env: &[(&str, String)], inner: &[String]) -> Vec<String> {
    let mut argv: Vec<String> = ["docker", "exec", "-i", "-u", "postgres"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    for (name, value) in env {
        argv.push("-e".to_string());
        argv.push(format!("{}={}", name, value));
    }
    argv.push(container.to_string());
    argv.extend(inner.iter().cloned());
    argv
}

/// Id of a running container that can run psql.
///
/// Containers of the `postgres` image come first, then containers named
/// after postgres, then any container with psql installed.
pub fn find_postgres_container(work_dir: &Path) -> Option<String> {
    for filter in ["ancestor=postgres", "name=postgres"] {
        if let Some(id) = docker_ps(work_dir, Some(filter)).into_iter().next() {
            return Some(id);
        }
    }
    docker_ps(work_dir, None)
        .into_iter()
        .find(|id| has_psql(work_dir, id))
}

fn docker_ps(work_dir: &Path, filter: Option<&str>) -> Vec<String> {
    let mut command = Command::new("docker");
    command.arg("ps");
    if let Some(filter) = filter {
        command.args(["--filter", filter]);
    }
    command
        .args(["--format", "{{.ID}}"])
        .current_dir(work_dir)
        .stdin(Stdio::null())
        .stderr(Stdio::null());

    match command.output() {
        Ok(output) if output.status.success() => {
            container_ids(&String::from_utf8_lossy(&output.stdout))
        }
        Ok(output) => {
            debug!(status = ?output.status.code(), "docker ps failed");
            Vec::new()
        }
        Err(e) => {
            debug!(error = %e, "cannot run docker");
            Vec::new()
        }
    }
}

fn container_ids(listing: &str) -> Vec<String> {
    listing
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect()
}

fn has_psql(work_dir: &Path, container: &str) -> bool {
    Command::new("docker")
        .args(["exec", container, "which", "psql"])
        .current_dir(work_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok_and(|status| status.success())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exit_codes;

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_exec_argv_wraps_psql() {
        let env = vec![
            ("PGUSER", "app".to_string()),
            ("PGDATABASE", "shop db".to_string()),
        ];
        let wrapped = exec_argv("3f2a9c", &env, &argv(&["psql", "-A", "-t", "-X"]));

        assert_eq!(
            wrapped,
            argv(&[
                "docker",
                "exec",
                "-i",
                "-u",
                "postgres",
                "-e",
                "PGUSER=app",
                "-e",
                "PGDATABASE=shop db",
                "3f2a9c",
                "psql",
                "-A",
                "-t",
                "-X",
            ])
        );
    }

    #[test]
    fn test_exec_argv_without_env() {
        let wrapped = exec_argv("abc", &[], &argv(&["psql"]));
        assert_eq!(wrapped, argv(&["docker", "exec", "-i", "-u", "postgres", "abc", "psql"]));
    }

    #[test]
    fn test_forwarded_env_keeps_set_variables_in_order() {
        let env = forwarded_env(|name| match name {
            "PGPORT" => Some("5433".to_string()),
            "PGUSER" => Some("app".to_string()),
            "HOME" => Some("/root".to_string()),
            _ => None,
        });
        assert_eq!(
            env,
            vec![("PGUSER", "app".to_string()), ("PGPORT", "5433".to_string())]
        );
    }

    #[test]
    fn test_required_env_present() {
        let env = vec![
            ("PGUSER", "app".to_string()),
            ("PGDATABASE", "shop".to_string()),
        ];
        assert!(check_required_env(&env).is_ok());
    }

    #[test]
    fn test_required_env_missing_is_user_error() {
        let err = check_required_env(&[("PGUSER", "app".to_string())]).unwrap_err();

        assert_eq!(err.exit_code(), exit_codes::USER_ERROR);
        let msg = err.to_string();
        assert!(msg.contains("PGDATABASE"));
        assert!(!msg.contains("PGUSER,"));
        assert!(msg.contains("Fix:"));
    }

    #[test]
    fn test_container_ids_skips_blank_lines() {
        assert_eq!(container_ids("abc\n\n  def \n"), argv(&["abc", "def"]));
        assert!(container_ids("").is_empty());
    }
}
