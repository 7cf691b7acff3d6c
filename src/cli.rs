// src/cli.rs
//! Command line interface and the commands behind it

use crate::{
    config::MissionConfig,
    display::{self, TerminalDisplay},
    error::{MissionError, Result},
    fleet::{self, Fleet, SharedFleet},
    manager::{self, MemoryWaypointManager, SharedManager, WaypointManager},
    panel::{Tab, WaypointListPanel},
    vehicle::{self, GlobalPosition, SimulatedVehicle, GCS_VEHICLE_ID},
    vehicle_list::VehicleListPanel,
};
use clap::{Parser, Subcommand};
use log::{info, warn};
use std::{
    future::Future,
    io::Write,
    path::{Path, PathBuf},
    time::Duration,
};

#[derive(Debug, Parser)]
#[command(name = "mission-list", version, about = "Waypoint list editor for ground control stations")]
pub struct Cli {
    /// Configuration file (defaults to ~/.config/mission-list/config.json)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Log filter, e.g. "debug" or "mission_list=trace"
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Walk through a scripted editing session and print each step
    Demo,
    /// Print a saved mission
    Show {
        file: PathBuf,
    },
    /// Fly a saved mission on the simulated vehicle and follow its progress until Ctrl-C
    Watch {
        file: PathBuf,
        /// Milliseconds between waypoint changes
        #[arg(long, default_value_t = 1000)]
        interval: u64,
    },
    /// Edit a mission interactively
    Edit {
        file: Option<PathBuf>,
        /// Start without a simulated vehicle
        #[arg(long)]
        offline: bool,
    },
}

impl Cli {
    pub fn load_config(&self) -> Result<MissionConfig> {
        match &self.config {
            Some(path) => MissionConfig::load_from(path),
            None => MissionConfig::load(),
        }
    }
}

pub async fn run(cli: &Cli) -> Result<()> {
    let config = cli.load_config().unwrap_or_else(|e| {
        warn!("{}, using defaults", e);
        MissionConfig::default()
    });

    match &cli.command {
        Command::Demo => demo(&config, &mut std::io::stdout()),
        Command::Show { file } => show(&config, file, &mut std::io::stdout()),
        Command::Watch { file, interval } => {
            let shutdown = async {
                if let Err(e) = tokio::signal::ctrl_c().await {
                    warn!("Cannot listen for Ctrl-C: {}", e);
                }
            };
            watch(
                &config,
                file,
                Duration::from_millis(*interval),
                &mut std::io::stdout(),
                shutdown,
            )
            .await
        }
        Command::Edit { file, offline } => edit(&config, cli.config.as_deref(), file.as_deref(), *offline),
    }
}

/// Fleet with one simulated vehicle parked at home, plus the ground station
fn simulated_fleet(config: &MissionConfig) -> (SharedFleet, SharedManager) {
    let memory = manager::shared(MemoryWaypointManager::from_config(config));

    let mut sim = SimulatedVehicle::new(1, "Simulated copter", memory.clone());
    sim.set_global_position(Some(GlobalPosition {
        latitude: config.home_latitude,
        longitude: config.home_longitude,
        altitude_amsl: 408.0,
        altitude_relative: 0.0,
    }));

    let gcs = SimulatedVehicle::new(
        GCS_VEHICLE_ID,
        "Ground station",
        manager::shared(MemoryWaypointManager::from_config(config)),
    );

    let fleet = Fleet::new().into_shared();
    {
        let mut guard = fleet::write(&fleet);
        guard.add_vehicle(vehicle::shared(sim));
        guard.add_vehicle(vehicle::shared(gcs));
    }
    (fleet, memory)
}

fn step(out: &mut impl Write, display: &TerminalDisplay, panel: &WaypointListPanel, title: &str) -> Result<()> {
    writeln!(out, "\n>>> {}", title)?;
    display.render_panel(out, panel)?;
    out.flush()?;
    Ok(())
}

/// Scripted session exercising every gesture
pub fn demo(config: &MissionConfig, out: &mut impl Write) -> Result<()> {
    let display = TerminalDisplay::new();
    let (fleet, memory) = simulated_fleet(config);

    let mut vehicles = VehicleListPanel::new(Some(fleet.clone()));
    let mut panel = WaypointListPanel::new(None, config.clone());
    panel.attach_fleet(fleet.clone());
    panel.set_visible(true);

    fleet::write(&fleet).set_active(1);
    panel.process_pending();
    vehicles.process_pending();
    display.render_vehicles(out, &vehicles)?;

    panel.add_editable();
    panel.process_pending();
    for _ in 0..3 {
        panel.add_editable();
        panel.process_pending();
    }
    step(out, &display, &panel, "home plus three waypoints")?;

    let list = manager::read(&memory).editable_list();
    if let Some(first) = list.get(1) {
        panel.move_bottom(first.handle);
        panel.process_pending();
        step(out, &display, &panel, "waypoint 1 moved to the bottom (same view id)")?;
    }

    panel.transmit();
    panel.refresh();
    panel.process_pending();
    step(out, &display, &panel, "mission sent and read back")?;

    panel.change_current_waypoint(2);
    panel.process_pending();
    step(out, &display, &panel, "vehicle flying to waypoint 2")?;

    let list = manager::read(&memory).editable_list();
    if let Some(second) = list.get(2) {
        panel.remove_waypoint(second.handle);
        panel.process_pending();
        step(out, &display, &panel, "waypoint 2 removed")?;
    }

    panel.clear_waypoints();
    panel.process_pending();
    step(out, &display, &panel, "cleared down to home")?;

    Ok(())
}

/// Print a saved mission
pub fn show(config: &MissionConfig, file: &Path, out: &mut impl Write) -> Result<()> {
    let mut memory = MemoryWaypointManager::from_config(config);
    memory
        .load_waypoints(file)
        .map_err(|e| MissionError::Other(format!("Cannot open {}: {}", file.display(), e)))?;

    let mut panel = WaypointListPanel::new(Some(manager::shared(memory)), config.clone());
    panel.process_pending();
    panel.set_active_tab(Tab::Editable);

    TerminalDisplay::new().render_panel(out, &panel)?;
    out.flush()?;
    Ok(())
}

/// Advance the simulated vehicle's current waypoint every `interval`, wrapping at the end
async fn fly_mission(memory: SharedManager, interval: Duration) {
    let mut ticker = tokio::time::interval(interval.max(Duration::from_millis(1)));
    let mut seq: usize = 0;
    loop {
        ticker.tick().await;
        let mut guard = manager::write(&memory);
        let count = guard.view_only_list().len();
        if count == 0 {
            continue;
        }
        seq = (seq + 1) % count;
        guard.set_current_waypoint(seq as u16);
    }
}

/// Upload `file` to a simulated vehicle and render the panel after every notification
pub async fn watch<F>(
    config: &MissionConfig,
    file: &Path,
    interval: Duration,
    out: &mut impl Write,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()>,
{
    let display = TerminalDisplay::new();
    let (fleet, memory) = simulated_fleet(config);

    let mut panel = WaypointListPanel::new(None, config.clone());
    panel.attach_fleet(fleet.clone());
    fleet::write(&fleet).set_active(1);
    panel.process_pending();

    manager::write(&memory)
        .load_waypoints(file)
        .map_err(|e| MissionError::Other(format!("Cannot open {}: {}", file.display(), e)))?;
    panel.transmit();
    panel.refresh();
    panel.process_pending();
    display.render_panel(out, &panel)?;
    out.flush()?;

    let autopilot = tokio::spawn(fly_mission(memory.clone(), interval));
    panel
        .run_with(shutdown, |panel| {
            let rendered = display
                .render_panel(out, panel)
                .and_then(|_| out.flush().map_err(MissionError::from));
            if let Err(e) = rendered {
                warn!("Rendering failed: {}", e);
            }
        })
        .await;
    autopilot.abort();

    info!("Stopped watching {}", file.display());
    Ok(())
}

/// Write the home position and waypoint defaults chosen in a session back to disk
fn persist_config(panel: &mut WaypointListPanel, loaded: &MissionConfig, path: Option<&Path>) -> Result<()> {
    panel.sync_config_defaults();
    if panel.config() == loaded {
        return Ok(());
    }

    info!("Saving updated configuration");
    match path {
        Some(path) => panel.config().save_to(path),
        None => panel.config().save(),
    }
}

/// Interactive editor session
pub fn edit(config: &MissionConfig, config_path: Option<&Path>, file: Option<&Path>, offline: bool) -> Result<()> {
    if !display::is_interactive() {
        return Err(MissionError::Terminal("edit needs an interactive terminal".to_string()));
    }

    let (fleet, memory) = simulated_fleet(config);
    let mut panel = if offline {
        WaypointListPanel::new(Some(memory.clone()), config.clone())
    } else {
        let mut panel = WaypointListPanel::new(None, config.clone());
        panel.attach_fleet(fleet.clone());
        fleet::write(&fleet).set_active(1);
        panel
    };
    panel.process_pending();

    if let Some(path) = file {
        info!("Loading {}", path.display());
        panel.load_waypoints(Some(path));
    }

    TerminalDisplay::new().run_editor(&mut panel)?;
    persist_config(&mut panel, config, config_path)
}
