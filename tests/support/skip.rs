/// Skip a test if gpg is not installed.
#[macro_export]
macro_rules! skip_without_gpg {
    () => {
        if std::process::Command::new("gpg")
            .arg("--version")
            .output()
            .map(|o| !o.status.success())
            .unwrap_or(true)
        {
            eprintln!("SKIPPED: gpg not found on PATH");
            return;
        }
    };
}
