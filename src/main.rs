//! SmartScale firmware entry point
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  HardwareAdapter      LogEventSink   NvsRegion    Esp32Time    │
//! │  (Sample+Relay)       (EventSink)    (RegionPort) (Clock)      │
//! │  HTTP server ─┐       console thread ─┐                        │
//! │               └── mpsc<AppCommand> ───┴──▶ poll loop           │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │            ScaleService (pure logic)                   │    │
//! │  │  ParameterStore · Controller (latch + timer)           │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
#![deny(unused_must_use)]

use std::io::BufRead;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use anyhow::{anyhow, Result};
use esp_idf_hal::delay::{Ets, FreeRtos};
use esp_idf_hal::gpio::{AnyIOPin, PinDriver};
use esp_idf_hal::modem::Modem;
use esp_idf_hal::peripherals::Peripherals;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::http::Method;
use esp_idf_svc::http::server::{Configuration as HttpConfiguration, EspHttpServer};
use esp_idf_svc::io::Write;
use esp_idf_svc::mdns::EspMdns;
use esp_idf_svc::wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi};
use log::{error, info, warn};

use smartscale::adapters::console::{self, ConsoleCommand};
use smartscale::adapters::hardware::{HardwareAdapter, SamplingIrqGate};
use smartscale::adapters::http::{self, HttpAction};
use smartscale::adapters::log_sink::LogEventSink;
use smartscale::adapters::nvs::NvsRegion;
use smartscale::adapters::time::Esp32TimeAdapter;
use smartscale::app::commands::AppCommand;
use smartscale::app::ports::{Clock, RelayPort, SamplePort};
use smartscale::app::service::{ScaleService, StatusSnapshot};
use smartscale::config::{ControllerConfig, HTTP_PORT, MDNS_HOSTNAME};
use smartscale::diagnostics::hex_dump;
use smartscale::drivers::hw_init;
use smartscale::drivers::hx711::Hx711;
use smartscale::drivers::relay::RelayDriver;
use smartscale::error::Error;
use smartscale::events::DATA_READY;
use smartscale::sensors::load_cell::LoadCell;
use smartscale::store::ParameterStore;

const WIFI_SSID: Option<&str> = option_env!("SMARTSCALE_WIFI_SSID");
const WIFI_PASS: Option<&str> = option_env!("SMARTSCALE_WIFI_PASS");

/// Commands from the HTTP and console threads into the poll loop.
enum Inbound {
    App(AppCommand),
    Dump,
}

type SharedStatus = Arc<Mutex<StatusSnapshot>>;

// ── Main ──────────────────────────────────────────────────────

fn main() -> Result<()> {
    // ── 1. ESP-IDF bootstrap ──────────────────────────────────
    esp_idf_svc::sys::link_patches();
    esp_idf_logger::init()?;

    info!("╔══════════════════════════════════════╗");
    info!("║  SmartScale v{}                      ║", env!("CARGO_PKG_VERSION"));
    info!("╚══════════════════════════════════════╝");

    let config = ControllerConfig::default();
    config.validate().map_err(Error::Config)?;
    let pins = config.pins;

    let peripherals = Peripherals::take()?;
    let sysloop = EspSystemEventLoop::take()?;
    let clock = Esp32TimeAdapter::new();

    // ── 2. Peripherals ────────────────────────────────────────
    // SAFETY: the three GPIOs are distinct (checked by validate()) and
    // not claimed through `peripherals.pins` anywhere else.
    let (dout, sck, relay_pin) = unsafe {
        (
            AnyIOPin::new(pins.hx711_dout),
            AnyIOPin::new(pins.hx711_sck),
            AnyIOPin::new(pins.relay),
        )
    };
    let dout = PinDriver::input(dout)?;
    let sck = PinDriver::output(sck)?;
    let relay_pin = PinDriver::output(relay_pin)?;

    let adc = Hx711::new(dout, sck, Ets).map_err(Error::Sampling)?;
    let mut load_cell = LoadCell::new(adc);
    if let Err(e) = load_cell.start(
        &clock,
        &mut FreeRtos,
        config.stabilize_ms,
        config.baseline_timeout_ms,
        config.tare_on_boot,
    ) {
        // No usable baseline; the task watchdog resets the board.
        error!("load cell start failed: {}, halting", e);
        #[allow(clippy::empty_loop)]
        loop {}
    }
    // The flag is attached only once its ISR is live.
    match hw_init::init_data_ready_isr(pins.hx711_dout) {
        Ok(()) => load_cell = load_cell.with_data_ready(&DATA_READY),
        Err(e) => warn!("{}; sampling falls back to polling DOUT", e),
    }

    let mut hw = HardwareAdapter::new(load_cell, RelayDriver::new(relay_pin, true));

    // ── 3. Parameter store + service ──────────────────────────
    let region = NvsRegion::new().map_err(|e| anyhow!("nvs: {}", e))?;
    let store = ParameterStore::new(region, SamplingIrqGate::new(pins.hx711_dout));
    let mut service = ScaleService::new(store, &config);
    let mut log_sink = LogEventSink::new();

    let report = service.boot(&mut hw, &mut log_sink)?;
    if !report.is_clean() {
        warn!("parameter region repaired at boot ({} issue(s))", report.recovered.len());
    }

    // ── 4. Network + command channels ─────────────────────────
    let status: SharedStatus = Arc::new(Mutex::new(service.status()));
    let (tx, rx) = mpsc::channel::<Inbound>();

    spawn_console(tx.clone())?;

    // Keep network handles alive for the lifetime of the loop.
    let _net = match start_network(peripherals.modem, sysloop, status.clone(), tx) {
        Ok(net) => Some(net),
        Err(e) => {
            warn!("network unavailable ({:#}); console only", e);
            None
        }
    };

    info!("System ready. Entering poll loop.");

    // ── 5. Poll loop ──────────────────────────────────────────
    let poll_interval = Duration::from_millis(u64::from(config.poll_interval_ms));
    loop {
        drain_inbound(&rx, &mut service, &mut hw, &mut log_sink);

        service.poll(clock.now_ms(), &mut hw, &mut log_sink);

        if let Ok(mut snap) = status.lock() {
            *snap = service.status();
        }

        std::thread::sleep(poll_interval);
    }
}

fn drain_inbound(
    rx: &Receiver<Inbound>,
    service: &mut ScaleService<NvsRegion, SamplingIrqGate>,
    hw: &mut (impl SamplePort + RelayPort),
    sink: &mut LogEventSink,
) {
    while let Ok(msg) = rx.try_recv() {
        match msg {
            Inbound::App(cmd) => {
                if let Err(e) = service.handle_command(cmd, hw, sink) {
                    warn!("{:?} rejected: {}", cmd, e);
                }
            }
            Inbound::Dump => match service.dump_region() {
                Ok(image) => {
                    for line in hex_dump(&image) {
                        info!("{}", line);
                    }
                }
                Err(e) => warn!("dump failed: {}", e),
            },
        }
    }
}

// ── Console ───────────────────────────────────────────────────

fn spawn_console(tx: Sender<Inbound>) -> Result<()> {
    std::thread::Builder::new()
        .name("console".into())
        .stack_size(4 * 1024)
        .spawn(move || {
            let stdin = std::io::stdin();
            let mut line = String::new();
            loop {
                line.clear();
                match stdin.lock().read_line(&mut line) {
                    Ok(n) if n > 0 => {}
                    // UART stdin is non-blocking; back off until a line arrives.
                    _ => {
                        std::thread::sleep(Duration::from_millis(50));
                        continue;
                    }
                }
                let msg = match console::parse(&line) {
                    Ok(ConsoleCommand::Help) => {
                        for l in console::HELP {
                            info!("{}", l);
                        }
                        continue;
                    }
                    Ok(ConsoleCommand::Dump) => Inbound::Dump,
                    Ok(ConsoleCommand::App(cmd)) => Inbound::App(cmd),
                    Err(console::ConsoleError::Empty) => continue,
                    Err(e) => {
                        warn!("console: {}", e);
                        continue;
                    }
                };
                if tx.send(msg).is_err() {
                    break;
                }
            }
        })?;
    Ok(())
}

// ── Network ───────────────────────────────────────────────────

struct Network {
    _wifi: BlockingWifi<EspWifi<'static>>,
    _http: EspHttpServer<'static>,
    _mdns: EspMdns,
}

fn start_network(
    modem: Modem,
    sysloop: EspSystemEventLoop,
    status: SharedStatus,
    tx: Sender<Inbound>,
) -> Result<Network> {
    let ssid = WIFI_SSID.ok_or_else(|| anyhow!("SMARTSCALE_WIFI_SSID not set at build time"))?;
    let pass = WIFI_PASS.unwrap_or("");

    let mut wifi = BlockingWifi::wrap(EspWifi::new(modem, sysloop.clone(), None)?, sysloop)?;
    wifi.set_configuration(&Configuration::Client(ClientConfiguration {
        ssid: ssid.try_into().map_err(|_| anyhow!("wifi ssid too long"))?,
        password: pass.try_into().map_err(|_| anyhow!("wifi password too long"))?,
        auth_method: if pass.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPAWPA2Personal
        },
        ..Default::default()
    }))?;
    wifi.start()?;
    wifi.connect()?;
    wifi.wait_netif_up()?;
    let ip = wifi.wifi().sta_netif().get_ip_info()?.ip;
    info!("wifi connected to '{}', ip {}", ssid, ip);

    let http = start_http(status, tx)?;

    let mut mdns = EspMdns::take()?;
    mdns.set_hostname(MDNS_HOSTNAME)?;
    mdns.set_instance_name(MDNS_HOSTNAME)?;
    mdns.add_service(None, "_http", "_tcp", HTTP_PORT, &[])?;
    info!("mDNS: http://{}.local", MDNS_HOSTNAME);

    Ok(Network {
        _wifi: wifi,
        _http: http,
        _mdns: mdns,
    })
}

fn start_http(status: SharedStatus, tx: Sender<Inbound>) -> Result<EspHttpServer<'static>> {
    let conf = HttpConfiguration {
        http_port: HTTP_PORT,
        uri_match_wildcard: true,
        ..Default::default()
    };
    let mut server = EspHttpServer::new(&conf)?;

    server.fn_handler::<anyhow::Error, _>("/*", Method::Get, move |req| {
        let (path, query) = http::split_uri(req.uri());
        let snapshot = status
            .lock()
            .map(|s| *s)
            .map_err(|_| anyhow!("status lock poisoned"))?;
        let action = http::dispatch(path, query, &snapshot);
        if let HttpAction::Enqueue(cmd, _) = &action {
            tx.send(Inbound::App(*cmd))
                .map_err(|_| anyhow!("poll loop gone"))?;
        }
        let reply = action.reply();
        req.into_response(reply.status, None, &[("Content-Type", reply.content_type)])?
            .write_all(reply.body.as_bytes())?;
        Ok(())
    })?;

    info!("HTTP server listening on port {}", HTTP_PORT);
    Ok(server)
}
