//! GnuPG engine.
//!
//! Drives the `gpg` program. Key listings come from `--with-colons`, and
//! operation results from the `--status-fd` machine interface.
//!
//! ## Requirements
//!
//! - `gpg` 2.2 or newer on `PATH` (or configured with `engine.program`)
//! - keys in the keyring of the configured home directory
//! - adding or changing recipients of an existing file needs a gpg that
//!   provides `--add-recipients` / `--change-recipients`
//!
//! The program is located lazily, so building an engine never fails.

use std::cell::OnceCell;
use std::ffi::OsString;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Output, Stdio};

use tracing::{debug, trace};

use super::{
    Context, Data, EncryptFlags, Engine, EngineInfo, EngineResult, KeyHandle, SignMode,
};
use crate::core::config::EngineConfig;
use crate::core::model::{DecryptResult, VerifyResult};
use crate::error::EngineError;

mod colons;
mod status;

use status::StatusLog;

/// Engine backed by the `gpg` program.
#[derive(Debug, Clone)]
pub struct GpgEngine {
    program: String,
    homedir: Option<PathBuf>,
    min_version: String,
    show_session_key: bool,
    resolved: OnceCell<PathBuf>,
}

impl Default for GpgEngine {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

impl GpgEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            program: config.program.clone(),
            homedir: config.homedir.clone(),
            min_version: config.min_version.clone(),
            show_session_key: config.show_session_key,
            resolved: OnceCell::new(),
        }
    }

    /// Configured home directory, if any.
    pub fn homedir(&self) -> Option<&Path> {
        self.homedir.as_deref()
    }

    fn program(&self) -> EngineResult<PathBuf> {
        if let Some(path) = self.resolved.get() {
            return Ok(path.clone());
        }
        let path = which::which(&self.program).map_err(|_| EngineError::NotFound {
            program: self.program.clone(),
        })?;
        debug!(program = %path.display(), "resolved gpg");
        Ok(self.resolved.get_or_init(|| path).clone())
    }

    fn command(&self) -> EngineResult<Command> {
        let mut cmd = Command::new(self.program()?);
        cmd.args(["--batch", "--no-tty"]);
        if let Some(home) = &self.homedir {
            cmd.arg("--homedir").arg(home);
        }
        Ok(cmd)
    }

    /// Version and home directory as printed by `gpg --version`.
    fn version_info(&self) -> EngineResult<(String, Option<String>)> {
        let mut cmd = self.command()?;
        cmd.arg("--version");
        let out = run(cmd, None)?;
        if !out.status.success() {
            return Err(EngineError::Failed {
                call: "version",
                reason: String::from_utf8_lossy(&out.stderr).trim().to_string(),
            });
        }
        parse_version_output(&String::from_utf8_lossy(&out.stdout))
            .ok_or_else(|| EngineError::Parse("unrecognized --version output".to_string()))
    }
}

impl Engine for GpgEngine {
    type Context = GpgContext;

    fn name(&self) -> &'static str {
        "gpg"
    }

    fn new_context(&self) -> EngineResult<GpgContext> {
        // resolve up front so a missing program fails here
        self.program()?;
        Ok(GpgContext {
            engine: self.clone(),
            armor: false,
            log: StatusLog::default(),
        })
    }

    fn lookup_keys(&self, pattern: &str, secret_only: bool) -> EngineResult<Vec<KeyHandle>> {
        let mut cmd = self.command()?;
        cmd.args(["--with-colons", "--fixed-list-mode", "--with-fingerprint"]);
        cmd.arg(if secret_only {
            "--list-secret-keys"
        } else {
            "--list-sigs"
        });
        if !pattern.trim().is_empty() {
            cmd.arg("--").arg(pattern);
        }

        let out = run(cmd, None)?;
        let listing = String::from_utf8_lossy(&out.stdout);
        let keys = colons::parse_keys(&listing, secret_only);

        if !out.status.success() && keys.is_empty() {
            let stderr = String::from_utf8_lossy(&out.stderr);
            if !is_no_match(&stderr) {
                return Err(EngineError::Failed {
                    call: "list keys",
                    reason: StatusLog::parse(&stderr)
                        .reason()
                        .unwrap_or_else(|| out.status.to_string()),
                });
            }
            debug!(pattern, "no matching keys");
        }
        trace!(pattern, secret_only, found = keys.len(), "keys listed");
        Ok(keys)
    }

    fn info(&self) -> EngineResult<EngineInfo> {
        let program = self.program()?;
        let (version, home) = self.version_info()?;
        Ok(EngineInfo {
            file_name: program.display().to_string(),
            home_dir: self
                .homedir
                .as_ref()
                .map(|h| h.display().to_string())
                .or(home),
            required_version: self.min_version.clone(),
            version,
        })
    }

    fn check_version(&self) -> EngineResult<()> {
        let (found, _) = self.version_info()?;
        if version_at_least(&found, &self.min_version) {
            Ok(())
        } else {
            Err(EngineError::Version {
                required: self.min_version.clone(),
                found,
            })
        }
    }
}

/// One gpg invocation context. Holds the status log of the last call.
#[derive(Debug)]
pub struct GpgContext {
    engine: GpgEngine,
    armor: bool,
    log: StatusLog,
}

impl GpgContext {
    /// Run one gpg call and record its status log. Whether the call
    /// succeeded is left to the caller, since gpg exits non-zero for
    /// signature problems it also reports on the status channel.
    fn invoke(
        &mut self,
        call: &'static str,
        args: Vec<OsString>,
        input: &mut Data,
        output: &mut Data,
    ) -> EngineResult<ExitStatus> {
        let mut cmd = self.engine.command()?;
        cmd.args(["--status-fd", "2"]);
        if self.armor {
            cmd.arg("--armor");
        }
        cmd.args(&args);
        cmd.arg("--output");
        match output.path() {
            Some(path) => cmd.arg(path),
            None => cmd.arg("-"),
        };
        let stdin = match input.path().map(Path::to_path_buf) {
            Some(path) => {
                cmd.arg(path);
                None
            }
            None => Some(input.read_remaining()?),
        };

        debug!(call, "invoking gpg");
        let out = run(cmd, stdin.as_deref())?;
        self.log = StatusLog::parse(&String::from_utf8_lossy(&out.stderr));

        if output.path().is_none() {
            output.write_all(&out.stdout)?;
        }
        trace!(call, stdout = out.stdout.len(), status = %out.status, "gpg finished");
        Ok(out.status)
    }

    /// Run a call that only succeeds on a zero exit.
    fn invoke_checked(
        &mut self,
        call: &'static str,
        args: Vec<OsString>,
        input: &mut Data,
        output: &mut Data,
    ) -> EngineResult<()> {
        let status = self.invoke(call, args, input, output)?;
        if status.success() {
            Ok(())
        } else {
            Err(self.failure(call, status))
        }
    }

    fn failure(&self, call: &'static str, status: ExitStatus) -> EngineError {
        if self.log.no_data() {
            return EngineError::NoData;
        }
        EngineError::Failed {
            call,
            reason: self.log.reason().unwrap_or_else(|| status.to_string()),
        }
    }
}

impl Context for GpgContext {
    fn set_armor(&mut self, armor: bool) {
        self.armor = armor;
    }

    fn sign(
        &mut self,
        signers: &[KeyHandle],
        input: &mut Data,
        output: &mut Data,
        mode: SignMode,
    ) -> EngineResult<()> {
        let mut args: Vec<OsString> = vec!["--yes".into()];
        for key in signers {
            args.push("--local-user".into());
            args.push(key.fingerprint.clone().into());
        }
        args.push(
            match mode {
                SignMode::Normal => "--sign",
                SignMode::Detach => "--detach-sign",
                SignMode::Clear => "--clearsign",
            }
            .into(),
        );
        self.invoke_checked("sign", args, input, output)
    }

    fn encrypt(
        &mut self,
        recipients: &[KeyHandle],
        flags: EncryptFlags,
        input: &mut Data,
        output: &mut Data,
    ) -> EngineResult<()> {
        self.invoke_checked("encrypt", encrypt_args(recipients, flags, false), input, output)
    }

    fn encrypt_sign(
        &mut self,
        recipients: &[KeyHandle],
        flags: EncryptFlags,
        input: &mut Data,
        output: &mut Data,
    ) -> EngineResult<()> {
        self.invoke_checked("encrypt", encrypt_args(recipients, flags, true), input, output)
    }

    fn decrypt_verify(&mut self, input: &mut Data, output: &mut Data) -> EngineResult<()> {
        let mut args: Vec<OsString> = Vec::new();
        if self.engine.show_session_key {
            args.push("--show-session-key".into());
        }
        args.push("--decrypt".into());
        let status = self.invoke("decrypt", args, input, output)?;
        // an unverifiable signature makes gpg exit non-zero after a
        // successful decryption
        if self.log.decryption_okay() || status.success() {
            Ok(())
        } else {
            Err(self.failure("decrypt", status))
        }
    }

    fn decrypt_result(&self) -> EngineResult<DecryptResult> {
        Ok(self.log.decrypt_result())
    }

    fn verify_result(&self) -> EngineResult<VerifyResult> {
        Ok(self.log.verify_result())
    }

    fn verify(&mut self, signed: &mut Data, plain: &mut Data) -> EngineResult<VerifyResult> {
        let status = self.invoke("verify", vec!["--decrypt".into()], signed, plain)?;
        let result = self.log.verify_result();
        // bad or uncheckable signatures are reported, not raised
        if status.success() || !result.signatures.is_empty() {
            Ok(result)
        } else {
            Err(self.failure("verify", status))
        }
    }
}

fn encrypt_args(recipients: &[KeyHandle], flags: EncryptFlags, sign: bool) -> Vec<OsString> {
    let mut args: Vec<OsString> = Vec::new();
    if flags.contains(EncryptFlags::ALWAYS_TRUST) {
        args.push("--trust-model".into());
        args.push("always".into());
    }
    if flags.contains(EncryptFlags::NO_ENCRYPT_TO) {
        args.push("--no-encrypt-to".into());
    }
    if flags.contains(EncryptFlags::NO_COMPRESS) {
        args.push("--compress-algo".into());
        args.push("none".into());
    }
    if flags.contains(EncryptFlags::THROW_KEYIDS) {
        args.push("--throw-keyids".into());
    }
    for key in recipients {
        args.push("--recipient".into());
        args.push(key.fingerprint.clone().into());
    }

    if flags.contains(EncryptFlags::ADD_RECIPIENTS) {
        args.push("--add-recipients".into());
        return args;
    }
    if flags.contains(EncryptFlags::CHANGE_RECIPIENTS) {
        args.push("--change-recipients".into());
        return args;
    }

    // the caller picked the destination, so overwrite it
    args.push("--yes".into());
    if flags.contains(EncryptFlags::SYMMETRIC) {
        args.push("--symmetric".into());
    }
    if !recipients.is_empty() {
        args.push("--encrypt".into());
    }
    if sign {
        args.push("--sign".into());
    }
    args
}

/// Run `cmd`, feeding `stdin` from a scoped thread while stdout and stderr
/// are collected, so a full pipe cannot deadlock either side.
fn run(mut cmd: Command, stdin: Option<&[u8]>) -> EngineResult<Output> {
    cmd.stdin(if stdin.is_some() {
        Stdio::piped()
    } else {
        Stdio::null()
    })
    .stdout(Stdio::piped())
    .stderr(Stdio::piped());

    trace!(command = ?cmd, "spawning");
    let mut child = cmd.spawn()?;
    let pipe = child.stdin.take();

    std::thread::scope(|scope| {
        let feeder = match (pipe, stdin) {
            (Some(mut pipe), Some(bytes)) => Some(scope.spawn(move || pipe.write_all(bytes))),
            _ => None,
        };

        let output = child.wait_with_output()?;

        if let Some(feeder) = feeder {
            match feeder.join() {
                // gpg may stop reading early when it rejects the input
                Ok(Err(e)) if e.kind() != io::ErrorKind::BrokenPipe => return Err(e.into()),
                Ok(_) => {}
                Err(_) => {
                    return Err(EngineError::Failed {
                        call: "stdin",
                        reason: "input writer panicked".to_string(),
                    })
                }
            }
        }
        Ok(output)
    })
}

/// gpg reports a pattern that matches nothing as a key-reading error; any
/// other failure (a fatal setup error, a broken keyring) is real.
fn is_no_match(stderr: &str) -> bool {
    !stderr.contains("Fatal:")
        && (stderr.contains("No public key") || stderr.contains("No secret key"))
}

/// First line's last word is the version; `Home:` names the home directory.
fn parse_version_output(text: &str) -> Option<(String, Option<String>)> {
    let version = text.lines().next()?.split_whitespace().last()?.to_string();
    let home = text
        .lines()
        .find_map(|l| l.strip_prefix("Home:"))
        .map(|h| h.trim().to_string());
    Some((version, home))
}

/// Compare dotted versions numerically; trailing text on a component
/// (`2.4.3-beta`) is ignored and missing components count as zero.
fn version_at_least(found: &str, required: &str) -> bool {
    fn components(v: &str) -> Vec<u32> {
        v.split('.')
            .map(|part| {
                let digits: String = part.chars().take_while(char::is_ascii_digit).collect();
                digits.parse().unwrap_or(0)
            })
            .collect()
    }

    let (mut found, mut required) = (components(found), components(required));
    let len = found.len().max(required.len());
    found.resize(len, 0);
    required.resize(len, 0);
    found >= required
}
