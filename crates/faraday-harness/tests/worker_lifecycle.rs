//! End-to-end worker lifecycle checks against a scripted command runner.
//!
//! These drive the real driver/worker/strategy stack; only the command
//! seam is a double, so the transcripts show exactly what would have hit
//! the devices and in what order.

use std::collections::BTreeMap;
use std::sync::Arc;

use faraday_common::{
    ChannelParams, Config, DiagMode, GlobalFlags, SnifferDevice, TestCaseRow, TrafficType,
};
use faraday_harness::driver::run_plan;
use faraday_remote::exec::CommandRunner;
use faraday_remote::recording::RecordingRunner;
use tempfile::TempDir;

const DUT: &str = "10.0.0.5";
const REMOTE: &str = "10.0.0.9";

fn row(traffic: TrafficType, params: &[(&str, &str)]) -> TestCaseRow {
    TestCaseRow {
        name: "lifecycle".into(),
        traffic,
        skip: false,
        duts: vec![DUT.into()],
        remotes: vec![REMOTE.into()],
        params: params
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect(),
    }
}

fn config(log_root: &TempDir, flags: GlobalFlags, rows: Vec<TestCaseRow>) -> Config {
    let mut flags = flags;
    flags.log_root = log_root.path().to_path_buf();
    flags.phase_timeout_secs = 30;
    let mut channels = BTreeMap::new();
    channels.insert(
        "ch36".to_string(),
        ChannelParams {
            freq_mhz: 5180,
            bandwidth_mhz: 80,
            band: "5g".into(),
            passive: false,
        },
    );
    Config {
        flags,
        sniffers: vec![SnifferDevice {
            name: "sn1".into(),
            host: "10.0.1.20".into(),
            user: "root".into(),
            password: String::new(),
            ifname: "wlan1".into(),
        }],
        channels,
        tests: rows,
    }
}

fn last_pos(transcript: &[String], needle: &str) -> usize {
    transcript
        .iter()
        .rposition(|line| line.contains(needle))
        .unwrap_or_else(|| panic!("no transcript line contains {needle:?}"))
}

#[test]
fn teardown_runs_in_release_order_even_after_test_failure() {
    let log_root = TempDir::new().unwrap();
    let flags = GlobalFlags {
        enable_attenuator: true,
        enable_sniffer: true,
        enable_tcpdump: true,
        diag_mode: DiagMode::LogArchive,
        ..GlobalFlags::default()
    };
    let config = config(
        &log_root,
        flags,
        vec![row(
            TrafficType::Tcp,
            &[
                ("ap_wifi_ssid", "lab-ap"),
                ("ap_wifi_pwd", "secret"),
                ("join_attempts", "1"),
                ("test_cycle_count", "1"),
                ("sniffer_channels", "ch36"),
                ("TrafficDirection", "DL"),
            ],
        )],
    );

    let runner = Arc::new(RecordingRunner::new());
    // Association never succeeds, so the strategy fails and teardown must
    // still release every acquired resource.
    runner.fail_matching("nmcli dev wifi connect");

    let shared: Arc<dyn CommandRunner> = runner.clone();
    let summary = run_plan(&config, shared.clone(), shared, &[]).unwrap();
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.passed, 0);

    let transcript = runner.transcript();
    let tcpdump_stop = last_pos(&transcript, "pkill -SIGINT -f tcpdump");
    let sniffer_stop = last_pos(&transcript, "pkill -SIGINT -f sniffer_tool");
    let final_diag = last_pos(&transcript, "tar czf /tmp/log_archive.tar.gz");
    let firmware_stop = last_pos(&transcript, "log collect --stop");
    let attenuator_reset = last_pos(&transcript, "attenuator attenuator_cli set 0");
    let iperf_stop = last_pos(&transcript, format!("{REMOTE} pkill iperf3").as_str());

    assert!(tcpdump_stop < sniffer_stop, "tcpdump stops before sniffers");
    assert!(sniffer_stop < final_diag, "sniffers stop before final diag");
    assert!(final_diag < firmware_stop, "diag precedes firmware stop");
    assert!(firmware_stop < attenuator_reset, "firmware precedes attenuator reset");
    assert!(attenuator_reset < iperf_stop, "attenuator reset precedes iperf stop");

    // The sniffer capture itself was started on the pool device.
    assert_eq!(runner.count_of("10.0.1.20 nohup sniffer_tool"), 1);
    // No iperf client ever ran; association failed first.
    assert_eq!(runner.count_of("iperf3 -c"), 0);
}

#[test]
fn rvr_sweep_steps_the_attenuator_and_runs_one_session_per_point() {
    let log_root = TempDir::new().unwrap();
    let flags = GlobalFlags {
        enable_attenuator: true,
        ..GlobalFlags::default()
    };
    let config = config(
        &log_root,
        flags,
        vec![row(
            TrafficType::Rvr,
            &[
                ("ap_wifi_ssid", "lab-ap"),
                ("ap_wifi_pwd", "secret"),
                ("start_attn_1", "0"),
                ("stop_attn_1", "4"),
                ("attn_step_dB", "2"),
                ("test_cycle_count", "1"),
                ("TrafficDirection", "DL"),
            ],
        )],
    );

    let runner = Arc::new(RecordingRunner::new());
    let shared: Arc<dyn CommandRunner> = runner.clone();
    let summary = run_plan(&config, shared.clone(), shared, &[]).unwrap();
    assert_eq!(summary.passed, 1);
    assert!(summary.all_passed());

    // 10.0.0.5 lands on port 5405 in the RvR window; one DL session per
    // sweep point.
    assert_eq!(runner.count_of(format!("{REMOTE} iperf3 -s -p 5405").as_str()), 3);
    assert_eq!(
        runner.count_of(format!("{DUT} iperf3 -c {REMOTE} -p 5405 -t 1").as_str()),
        3
    );

    // Levels 0, 2, 4 each set once; 0 dB also appears for the initial
    // acquisition set, the sweep-end reset and the teardown reset.
    assert_eq!(runner.count_of("attenuator_cli set 2"), 1);
    assert_eq!(runner.count_of("attenuator_cli set 4"), 1);
    assert_eq!(runner.count_of("attenuator_cli set 0"), 4);

    let transcript = runner.transcript();
    let level2 = last_pos(&transcript, "attenuator_cli set 2");
    let level4 = last_pos(&transcript, "attenuator_cli set 4");
    assert!(level2 < level4, "sweep ascends through the levels");
    assert!(level4 < last_pos(&transcript, "attenuator_cli set 0"));
}

#[test]
fn firmware_logs_are_pulled_even_when_the_start_failed() {
    let log_root = TempDir::new().unwrap();
    let config = config(
        &log_root,
        GlobalFlags::default(),
        vec![row(
            TrafficType::Join,
            &[("ap_wifi_ssid", "lab-ap"), ("ap_wifi_pwd", "secret")],
        )],
    );

    let runner = Arc::new(RecordingRunner::new());
    runner.fail_matching("log collect --start");

    let shared: Arc<dyn CommandRunner> = runner.clone();
    let summary = run_plan(&config, shared.clone(), shared, &[]).unwrap();
    // Firmware logging is best-effort; the Join itself still passes.
    assert_eq!(summary.passed, 1);

    // A failed start may have left partial bundles behind, so the
    // stop-and-pull still runs.
    assert_eq!(runner.count_of("log collect --stop"), 1);
    assert_eq!(runner.count_of("scp /var/log/wifi_fw/*.logarchive"), 1);
}

#[test]
fn autojoin_round_power_cycles_and_times_the_rejoin() {
    let log_root = TempDir::new().unwrap();
    let config = config(
        &log_root,
        GlobalFlags::default(),
        vec![row(
            TrafficType::AutoJoin,
            &[
                ("ap_wifi_ssid", "lab-ap"),
                ("ap_wifi_pwd", "secret"),
                ("join_attempts", "1"),
                ("join_on_off_interval", "0"),
            ],
        )],
    );

    let runner = Arc::new(RecordingRunner::new());
    // The link probe reports an association straight away.
    runner.respond("iw dev", 0, "Connected to aa:bb:cc:dd:ee:ff (on wlan0)", "");

    let shared: Arc<dyn CommandRunner> = runner.clone();
    let summary = run_plan(&config, shared.clone(), shared, &[]).unwrap();
    assert_eq!(summary.passed, 1);

    // One radio cycle from pre-test cleanup plus one from the round.
    assert_eq!(runner.count_of("nmcli radio wifi off"), 2);
    assert_eq!(runner.count_of("nmcli radio wifi on"), 2);
    assert!(runner.count_of("iw dev wlan0 link") >= 1);
}
