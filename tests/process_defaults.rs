//! Process-wide execution defaults.
//!
//! The locale flag and default wait delay are global, so they are tested
//! in their own binary and within a single test to keep them ordered.

use std::collections::BTreeMap;
use std::time::Duration;

use lvmkit::core::config::{Config, FileConfig};
use lvmkit::core::types::VolumeGroupName;
use lvmkit::exec::{
    build_command, default_wait_delay, set_default_wait_delay, set_use_standard_locale,
    use_standard_locale, ExecContext,
};

#[test]
fn process_defaults_flow_into_commands() {
    assert!(!use_standard_locale());
    assert_eq!(default_wait_delay(), Duration::ZERO);

    let ctx = ExecContext::new()
        .with_force_no_nsenter(true)
        .with_default_volume_group(VolumeGroupName::new("vg0").unwrap())
        .with_custom_environment(BTreeMap::from([(
            "LC_ALL".to_string(),
            "en_US.UTF-8".to_string(),
        )]));

    let spec = build_command(&ctx, "lvm", ["vgs"]);
    assert_eq!(spec.env_value("LC_ALL"), Some("en_US.UTF-8"));
    assert_eq!(spec.wait_delay(), Duration::ZERO);

    // Values from a config file become the new process defaults.
    Config::from_file(FileConfig {
        standard_locale: Some(true),
        wait_delay_ms: Some(250),
        ..Default::default()
    })
    .apply_process_defaults();
    assert!(use_standard_locale());
    assert_eq!(default_wait_delay(), Duration::from_millis(250));

    let spec = build_command(&ExecContext::new().with_force_no_nsenter(true), "lvm", ["vgs"]);
    assert_eq!(spec.env_value("LC_ALL"), Some("C"));
    assert_eq!(spec.wait_delay(), Duration::from_millis(250));

    // Caller environment is appended after the locale and wins.
    let spec = build_command(&ctx, "lvm", ["vgs"]);
    let keys: Vec<&str> = spec.env().iter().map(|(k, _)| k.as_str()).collect();
    assert_eq!(keys, ["LVM_VG_NAME", "LC_ALL", "LC_ALL"]);
    assert_eq!(spec.env_value("LC_ALL"), Some("en_US.UTF-8"));

    // A context's own delay beats the process default.
    let spec = build_command(
        &ctx.with_wait_delay(Duration::from_secs(2)),
        "lvm",
        ["vgs"],
    );
    assert_eq!(spec.wait_delay(), Duration::from_secs(2));

    // Absent values leave the defaults alone.
    Config::from_file(FileConfig::default()).apply_process_defaults();
    assert!(use_standard_locale());
    assert_eq!(default_wait_delay(), Duration::from_millis(250));

    set_use_standard_locale(false);
    set_default_wait_delay(Duration::ZERO);
    let spec = build_command(&ExecContext::new().with_force_no_nsenter(true), "lvm", ["vgs"]);
    assert_eq!(spec.env_value("LC_ALL"), None);
    assert_eq!(spec.wait_delay(), Duration::ZERO);
}
