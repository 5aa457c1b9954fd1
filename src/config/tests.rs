use super::*;

#[test]
fn cli_overrides_take_highest_precedence() {
    let mut raw = RawSettings::default();
    raw.server.port = Some(4000);
    raw.logging.level = Some("info".to_string());

    let overrides = ServeOverrides {
        server_port: Some(4321),
        log_level: Some("debug".to_string()),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert_eq!(settings.server.addr.port(), 4321);
    assert_eq!(settings.logging.level, LevelFilter::DEBUG);
}

#[test]
fn defaults_describe_a_local_in_memory_site() {
    let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

    assert_eq!(settings.server.addr.to_string(), "127.0.0.1:3000");
    assert!(settings.database.url.is_none());
    assert!(settings.database.run_migrations);
    assert!(settings.session.key.is_none());
    assert!(!settings.identity.is_configured());
    assert_eq!(settings.site.author_name, "Peak Life Journey");
    assert_eq!(settings.site.guest_page_size.get(), 10);
    assert_eq!(settings.cache.ttl, Duration::from_secs(300));
    assert_eq!(
        settings.uploads.max_request_bytes.get(),
        DEFAULT_UPLOAD_REQUEST_LIMIT_BYTES
    );
    assert_eq!(
        settings.uploads.base_url.as_str(),
        "https://api.cloudinary.com/"
    );
}

#[test]
fn blank_database_url_means_no_database() {
    let mut raw = RawSettings::default();
    raw.database.url = Some("   ".to_string());
    let settings = Settings::from_raw(raw).expect("valid settings");
    assert!(settings.database.url.is_none());
}

#[test]
fn both_session_keys_are_rejected() {
    let mut raw = RawSettings::default();
    raw.session.hs256_secret = Some("secret".to_string());
    raw.session.rs256_public_key_path = Some(PathBuf::from("/etc/peaklife/session.pem"));

    let err = Settings::from_raw(raw).expect_err("conflicting keys");
    assert!(matches!(err, LoadError::Invalid { key: "session", .. }));
}

#[test]
fn zero_page_size_names_the_key() {
    let mut raw = RawSettings::default();
    raw.site.guest_page_size = Some(0);

    let err = Settings::from_raw(raw).expect_err("zero page size");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "site.guest_page_size",
            ..
        }
    ));
}

#[test]
fn non_http_identity_url_is_rejected() {
    let mut raw = RawSettings::default();
    raw.identity.base_url = Some("ftp://identity.example".to_string());

    let err = Settings::from_raw(raw).expect_err("bad scheme");
    assert!(matches!(
        err,
        LoadError::Invalid {
            key: "identity.base_url",
            ..
        }
    ));
}

#[test]
fn bootstrap_email_must_look_like_an_email() {
    let mut raw = RawSettings::default();
    raw.site.bootstrap_admin_email = Some("not-an-email".to_string());
    assert!(Settings::from_raw(raw).is_err());
}

#[test]
fn cli_json_logging_enforces_format() {
    let mut raw = RawSettings::default();
    let overrides = ServeOverrides {
        log_json: Some(true),
        ..Default::default()
    };

    raw.apply_serve_overrides(&overrides);
    let settings = Settings::from_raw(raw).expect("valid settings");

    assert!(matches!(settings.logging.format, LogFormat::Json));
}

#[test]
fn default_to_serve_command() {
    let args = CliArgs::parse_from(["peaklife"]);
    let command = args
        .command
        .unwrap_or(Command::Serve(Box::<ServeArgs>::default()));
    assert!(matches!(command, Command::Serve(_)));
}

#[test]
fn parse_serve_overrides() {
    let args = CliArgs::parse_from([
        "peaklife",
        "serve",
        "--server-host",
        "0.0.0.0",
        "--database-url",
        "postgres://override",
        "--bootstrap-admin-email",
        "host@peaklife.test",
    ]);

    match args.command.expect("serve command") {
        Command::Serve(serve) => {
            assert_eq!(serve.overrides.server_host.as_deref(), Some("0.0.0.0"));
            assert_eq!(
                serve.overrides.database.database_url.as_deref(),
                Some("postgres://override")
            );
            assert_eq!(
                serve.overrides.bootstrap_admin_email.as_deref(),
                Some("host@peaklife.test")
            );
        }
        _ => panic!("wrong command parsed"),
    }
}

#[test]
fn parse_migrate_arguments() {
    let args = CliArgs::parse_from(["peaklife", "migrate", "--database-url", "postgres://x"]);

    match args.command.expect("migrate command") {
        Command::Migrate(migrate) => {
            assert_eq!(
                migrate.database.database_url.as_deref(),
                Some("postgres://x")
            );
        }
        _ => panic!("wrong command parsed"),
    }
}
