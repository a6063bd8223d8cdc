mod datasource;
mod model;
mod utils;

use std::{env, path::Path, sync::Arc, thread};

use anyhow::Result;
use log::{error, info};

use crate::{
    datasource::{
        config_parser::{apply_tunables, config_read},
        display_monitor::{init_display_state, monitor_display},
        file_path::*,
        input_monitor::{monitor_input, new_registry, scan_devices, watch_input_dir},
        kick_node::{ensure_kick_node, monitor_kick_node, watch_kick_node},
        node_monitor::{monitor_config, watch_config},
    },
    model::{
        cluster::{Cluster, CpufreqSink, probe_deepest_idle_latency_us},
        coordinator::{PolicyCoordinator, PolicyRefresh},
        driver::BoostDriver,
        hints::HintSinks,
        policy::PolicyBridge,
        tunables::Tunables,
    },
    utils::{
        constants::{AUTHOR, NOTES, SPECIAL, VERSION, defaults},
        log_monitor::monitor_log_level,
        logger::init_logger,
    },
};

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.len() > 1 {
        let i = 1;
        match args[i].as_str() {
            "-h" => {
                println!("{}", NOTES);
                println!("{}", AUTHOR);
                println!("{}", SPECIAL);
                println!("Usage:");
                println!("\t-v show version");
                println!("\t-h show help");
                return Ok(());
            }
            "-v" => {
                println!("{}", NOTES);
                println!("{}", AUTHOR);
                println!("{}", SPECIAL);
                println!("{}", VERSION);
                return Ok(());
            }
            _ => {
                println!("Unknown argument: {}", args[i]);
                println!("Use -h for help");
                return Ok(());
            }
        }
    }

    init_logger()?;

    info!("{}", NOTES);
    info!("{}", AUTHOR);
    info!("{}", SPECIAL);
    info!("{}", VERSION);

    // 读配置
    if !Path::new(CONFIG_FILE).exists() {
        error!("Config file not found: {}", CONFIG_FILE);
        return Err(anyhow::anyhow!("Config file not found: {}", CONFIG_FILE));
    }
    info!("Reading config file: {}", CONFIG_FILE);
    let config = config_read(CONFIG_FILE)?;

    let tunables = Arc::new(Tunables::default());
    apply_tunables(&config, &tunables);

    // 探测簇和最深空闲态延迟
    let clusters: Vec<Cluster> = config
        .clusters
        .iter()
        .map(|c| Cluster::probe(c.name.clone(), c.class, c.policy_path.clone()))
        .collect();
    if clusters.is_empty() {
        error!("No clusters configured, nothing to govern");
        return Err(anyhow::anyhow!("No clusters configured"));
    }

    let deepest_idle_us =
        probe_deepest_idle_latency_us(CPUIDLE_DIR).unwrap_or(defaults::DEEPEST_IDLE_LATENCY_US);
    info!("Deepest idle state entry latency: {deepest_idle_us}us");

    let bridge = PolicyBridge::new(Arc::clone(&tunables), deepest_idle_us);
    let hints = HintSinks::new(Arc::clone(&tunables));
    let sink: Arc<dyn PolicyRefresh> = Arc::new(CpufreqSink::new(clusters, bridge, hints));

    let driver = BoostDriver::new(Arc::clone(&tunables))?;

    // 所有可失败的注册（含 inotify 监控挂接）都在线程起跑前完成，
    // 任何一步失败都会沿 ? 反序解除之前的注册并中止——
    // 绝不带着部分事件源运行
    init_display_state(&driver)?;

    let registry = new_registry();
    scan_devices(&driver, &registry)?;

    ensure_kick_node()?;

    let input_watcher = watch_input_dir()?;
    let kick_watcher = watch_kick_node()?;
    let config_watcher = watch_config()?;

    info!("Loading");

    // Start monitoring threads
    let driver_clone = Arc::clone(&driver);
    let registry_clone = Arc::clone(&registry);
    thread::spawn(move || {
        if let Err(e) = monitor_input(driver_clone, registry_clone, input_watcher) {
            error!("Input hotplug monitor error: {}", e);
        }
    });

    let driver_clone = Arc::clone(&driver);
    thread::spawn(move || {
        if let Err(e) = monitor_display(driver_clone) {
            error!("Display monitor error: {}", e);
        }
    });

    let driver_clone = Arc::clone(&driver);
    thread::spawn(move || {
        if let Err(e) = monitor_kick_node(driver_clone, kick_watcher) {
            error!("Kick node monitor error: {}", e);
        }
    });

    let tunables_clone = Arc::clone(&tunables);
    thread::spawn(move || {
        if let Err(e) = monitor_config(tunables_clone, config_watcher) {
            error!("Config monitor error: {}", e);
        }
    });

    // 启动日志等级监控线程
    thread::spawn(move || {
        if let Err(e) = monitor_log_level() {
            error!("Log level monitor error: {}", e);
        }
    });

    info!("Monitor Inited");

    // Bootstrap information
    info!("Idle Floor: {}KHz", tunables.idle_min_freq_lp());
    info!("Boost Floor: {}KHz", tunables.boost_min_freq_lp());
    info!("Input Boost Duration: {}ms", tunables.input_boost_duration_ms());
    info!(
        "Boost Group Toggle: {}",
        if tunables.disable_boost() { "Disabled" } else { "Enabled" }
    );
    info!("Kick node: {}", KICK_NODE);
    info!("Display blank node: {}", FB_BLANK_PATH);
    info!("Log level file path: {}", LOG_LEVEL_PATH);

    info!("CPU Input Boost Governor Started");

    // 协调器独占策略重算；它退出意味着收到了停止信号
    let coordinator = PolicyCoordinator::new(Arc::clone(&driver), sink);
    let handle = coordinator.spawn()?;
    handle
        .join()
        .map_err(|_| anyhow::anyhow!("Policy coordinator thread panicked"))?;

    Ok(())
}
