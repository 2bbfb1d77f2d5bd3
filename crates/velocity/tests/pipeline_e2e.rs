//! End-to-end pipeline: discovery -> fingerprint -> two collection runs
//! with a config change on one device -> loaded rows, one moderate change
//! record and a diff file on disk.

use std::sync::Arc;

use velocity_archive::CaptureArchive;
use velocity_collector::{build_jobs, BatchDevice, CollectionOptions, Collector};
use velocity_db::{ArpCatDb, AssetsDb, DeviceUpsert};
use velocity_discovery::{Crawler, DiscoveryOptions};
use velocity_fingerprint::{FingerprintEngine, FingerprintOptions};
use velocity_loader::CaptureLoader;
use velocity_net::transport::Credentials;
use velocity_net::CancellationToken;
use velocity_protocol::config::ScoringConfig;
use velocity_protocol::inventory::SessionsFile;
use velocity_protocol::paths::DataLayout;
use velocity_protocol::{CaptureType, NullSink, Severity, SeverityThresholds, Vendor};
use velocity_testkit::{fixtures, MockConnector, MockDevice};

fn creds() -> Credentials {
    Credentials::password("admin", "pw")
}

/// Scripted three-switch lab; sw2.lab's running config is parameterized so
/// the second collection run can change it.
fn lab(connector: &MockConnector, sw2_config: &str) {
    let devices = [
        ("sw1", "10.0.0.1", "FCW1111A1AA"),
        ("sw2.lab", "10.0.0.2", "FCW2222B2BB"),
        ("sw3.lab", "10.0.0.3", "FOC3333C3CC"),
    ];
    for (name, ip, serial) in devices {
        let config = if name == "sw2.lab" {
            sw2_config.to_string()
        } else {
            fixtures::running_config(name, &[])
        };
        let cdp = match name {
            "sw1" => fixtures::cisco_cdp_detail(&[
                ("sw2.lab", "10.0.0.2", "cisco WS-C3850-48T", "Gi1/0/1", "Gi1/0/24"),
                ("sw3.lab", "10.0.0.3", "cisco WS-C2960X", "Gi1/0/2", "Gi0/48"),
            ]),
            "sw2.lab" => fixtures::cisco_cdp_detail(&[(
                "sw3.lab",
                "10.0.0.3",
                "cisco WS-C2960X",
                "Gi1/0/3",
                "Gi0/47",
            )]),
            _ => String::new(),
        };
        connector.add_device(
            &[ip],
            MockDevice::new(name)
                .with_output(
                    "show version",
                    fixtures::cisco_show_version(name, "16.12.04", serial),
                )
                .with_output("terminal length 0", "")
                .with_output("show lldp neighbors detail", "")
                .with_output("show cdp neighbors detail", cdp)
                .with_output("show running-config", config),
        );
    }
}

fn batch_devices(devices: &[velocity_db::Device]) -> Vec<BatchDevice> {
    devices
        .iter()
        .map(|d| BatchDevice {
            name: d.normalized_name.clone(),
            ip: d.management_ip.clone().unwrap_or_default(),
            vendor: d
                .platform
                .as_deref()
                .and_then(|p| p.parse::<Vendor>().ok())
                .unwrap_or(Vendor::Unknown),
        })
        .collect()
}

#[test]
fn baseline_and_change_across_two_collection_runs() {
    let dir = tempfile::tempdir().unwrap();
    let layout = DataLayout::new(dir.path());
    layout.ensure_layout().unwrap();

    let connector = MockConnector::new();
    lab(&connector, &fixtures::running_config("sw2.lab", &[]));
    let connector_arc = Arc::new(connector.clone());

    // Discovery from the seed.
    let crawler = Crawler::new(connector_arc.clone());
    let report = crawler
        .discover(
            "10.0.0.1",
            &creds(),
            &DiscoveryOptions {
                site_name: "lab".into(),
                ..Default::default()
            },
            &layout,
            &NullSink,
        )
        .unwrap();
    assert_eq!(report.device_count, 3);

    // Fingerprint the inventory, persisting devices the way the CLI does.
    let mut inventory = SessionsFile::load(&report.inventory_path).unwrap();
    let engine = FingerprintEngine::new(connector_arc.clone());
    let (outcomes, summary) = engine.fingerprint_inventory(
        &mut inventory,
        &creds(),
        &FingerprintOptions::default(),
        Arc::new(NullSink),
    );
    assert_eq!(summary.identified, 3);

    let rt = tokio::runtime::Runtime::new().unwrap();
    let assets = rt.block_on(AssetsDb::open_in_memory()).unwrap();
    let arp_cat = rt.block_on(ArpCatDb::open_in_memory()).unwrap();
    rt.block_on(async {
        for outcome in outcomes.iter().filter(|o| o.success) {
            assets
                .upsert_device(&DeviceUpsert {
                    name: outcome.name.clone(),
                    management_ip: Some(outcome.ip.clone()),
                    platform: Some(outcome.vendor.as_str().to_string()),
                    vendor: Some(outcome.vendor.display_name().to_string()),
                    software_version: outcome.fields.software_version.clone(),
                    serial: outcome.fields.serial.clone(),
                    source_system: Some("fingerprint".into()),
                    ..Default::default()
                })
                .await
                .unwrap();
        }
    });
    let devices = rt.block_on(assets.all_devices()).unwrap();
    assert_eq!(devices.len(), 3);

    let collector = Collector::new(connector_arc.clone(), layout.clone());
    let loader = CaptureLoader::new(
        assets.clone(),
        arp_cat.clone(),
        layout.clone(),
        ScoringConfig::default(),
    );
    let archive = CaptureArchive::new(assets.clone(), layout.clone(), SeverityThresholds::default());
    let options = CollectionOptions {
        auto_load_db: true,
        ..Default::default()
    };

    // First capture run: three baselines, zero changes.
    let jobs = build_jobs(&batch_devices(&devices), &[CaptureType::Configs]);
    let mut result = collector
        .run_collection(&jobs, &creds(), &options, &CancellationToken::new(), Arc::new(NullSink))
        .unwrap();
    assert_eq!(result.devices_succeeded, 3);
    rt.block_on(collector.load_and_archive(&mut result, &loader, &archive, &assets))
        .unwrap();
    assert_eq!(rt.block_on(assets.snapshot_count()).unwrap(), 3);
    assert_eq!(rt.block_on(assets.change_count()).unwrap(), 0);
    assert_eq!(result.changes_detected, 0);

    // Second run: sw2.lab gains 12 lines and loses its 3-line interface
    // block.
    let extra: Vec<String> = (0..12).map(|i| format!("snmp-server community ro{}", i)).collect();
    let extra_refs: Vec<&str> = extra.iter().map(String::as_str).collect();
    let changed = fixtures::running_config("sw2.lab", &extra_refs)
        .replace("interface Vlan20\n ip address 10.10.20.1 255.255.255.0\n!\n", "");
    lab(&connector, &changed);

    let mut result = collector
        .run_collection(&jobs, &creds(), &options, &CancellationToken::new(), Arc::new(NullSink))
        .unwrap();
    rt.block_on(collector.load_and_archive(&mut result, &loader, &archive, &assets))
        .unwrap();

    assert_eq!(rt.block_on(assets.snapshot_count()).unwrap(), 4);
    assert_eq!(rt.block_on(assets.change_count()).unwrap(), 1);
    assert_eq!(result.changes_detected, 1);

    let changes = rt.block_on(assets.recent_changes(1)).unwrap();
    assert_eq!(changes.len(), 1);
    let change = &changes[0];
    assert_eq!(change.capture_type, CaptureType::Configs);
    assert_eq!(change.lines_added, 12);
    assert_eq!(change.lines_removed, 3);
    assert_eq!(change.severity, Severity::Moderate);

    // The diff file exists under diffs/{device_id}/configs/.
    let sw2 = rt
        .block_on(assets.find_device("sw2.lab"))
        .unwrap()
        .expect("sw2.lab exists");
    assert_eq!(change.device_id, sw2.id);
    let diff_rel = change.diff_path.as_ref().expect("diff path recorded");
    let diff_abs = layout.base().join(diff_rel);
    assert!(diff_abs.is_file(), "missing diff file {}", diff_abs.display());
    let diff_text = std::fs::read_to_string(&diff_abs).unwrap();
    assert!(diff_text.contains("+snmp-server community ro0"));
    assert!(diff_text.contains("-interface Vlan20"));

    // History search sees the new content.
    let hits = rt
        .block_on(assets.search_snapshots("snmp-server", 10))
        .unwrap();
    assert!(!hits.is_empty());
}
