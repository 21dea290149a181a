use std::{
    thread,
    time::{Duration, Instant},
};

use anyhow::{anyhow, Result};
use embedded_svc::{
    http::{client::Client as HttpClient, Status},
    io::{Read, Write},
    wifi::{AuthMethod, ClientConfiguration, Configuration},
};
use esp_idf_hal::{
    delay::FreeRtos,
    gpio::AnyIOPin,
    i2c::{I2cConfig, I2cDriver},
    peripherals::Peripherals,
    prelude::*,
    uart::{config::Config as UartConfig, UartDriver},
};
use esp_idf_svc::{
    eventloop::EspSystemEventLoop,
    http::client::{Configuration as HttpClientConfiguration, EspHttpConnection},
    log::EspLogger,
    nvs::EspDefaultNvsPartition,
    wifi::EspWifi,
};
use log::{error, info, warn};

use energymon_common::{
    upload::payload_json, MeterAction, MeterConfig, MeterEngine, NetworkConfig, Reading,
};

use crate::{oled::Oled, pzem::Pzem};

const MAX_RESPONSE_LOG: usize = 2_048;

pub fn run() -> Result<()> {
    esp_idf_svc::sys::link_patches();
    EspLogger::initialize_default();

    info!("=================================");
    info!("Smart Energy Monitoring System");
    info!("=================================");

    let config = MeterConfig::default();
    let network = NetworkConfig::default();

    let peripherals = Peripherals::take()?;
    let pins = peripherals.pins;

    let i2c = I2cDriver::new(
        peripherals.i2c0,
        pins.gpio21,
        pins.gpio22,
        &I2cConfig::new().baudrate(400.kHz().into()),
    )?;

    let mut oled = match Oled::new(i2c) {
        Ok(oled) => oled,
        Err(err) => {
            error!("OLED initialization failed: {err:#}");
            // Display loss is the one unrecoverable fault; hold here forever.
            loop {
                thread::sleep(Duration::from_secs(60));
            }
        }
    };

    if let Err(err) = oled.boot_banner() {
        warn!("boot banner draw failed: {err:#}");
    }
    FreeRtos::delay_ms(config.boot_banner_ms as u32);

    let sys_loop = EspSystemEventLoop::take()?;
    let nvs = EspDefaultNvsPartition::take()?;
    let mut wifi = EspWifi::new(peripherals.modem, sys_loop, Some(nvs))?;

    if !connect_wifi(&mut wifi, &network, &config, &mut oled) {
        warn!("starting offline; reconnect happens on the next upload tick");
    }

    let uart = UartDriver::new(
        peripherals.uart1,
        pins.gpio17,
        pins.gpio16,
        None::<AnyIOPin>,
        None::<AnyIOPin>,
        &UartConfig::new().baudrate(Hertz(9_600)),
    )?;
    let mut pzem = Pzem::new(uart);

    info!("Initializing PZEM-004T...");
    FreeRtos::delay_ms(1_000);

    if pzem.read_sample().voltage.is_none() {
        warn!("PZEM-004T not responding");
        if let Err(err) = oled.show_error("PZEM Error") {
            warn!("error screen draw failed: {err:#}");
        }
        FreeRtos::delay_ms(config.error_hold_ms as u32);
    } else {
        info!("PZEM-004T initialized");
    }

    info!("System ready");

    let mut engine = MeterEngine::new(config.clone());
    let started = Instant::now();

    loop {
        engine.update_sample(pzem.read_sample());

        let now_ms = started.elapsed().as_millis() as u64;
        for action in engine.tick(now_ms) {
            match action {
                MeterAction::Render(view) => {
                    if let Err(err) = oled.render_page(&view) {
                        warn!("page render failed: {err:#}");
                    }
                }
                MeterAction::Upload(reading) => {
                    upload(&mut wifi, &network, &config, &mut oled, &reading);
                }
            }
        }

        FreeRtos::delay_ms(config.idle_delay_ms as u32);
    }
}

// Blocking: associates with the configured station and polls link status in
// fixed sleeps up to the bounded attempt count (30 x 500 ms). Failure is
// reported on screen and the device continues offline.
fn connect_wifi(
    wifi: &mut EspWifi<'static>,
    network: &NetworkConfig,
    config: &MeterConfig,
    oled: &mut Oled,
) -> bool {
    info!("Connecting to WiFi: {}", network.wifi_ssid);
    if let Err(err) = oled.connecting(&network.wifi_ssid) {
        warn!("connect screen draw failed: {err:#}");
    }

    let outcome = (|| -> Result<bool> {
        let auth_method = if network.wifi_pass.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPAWPA2Personal
        };

        wifi.set_configuration(&Configuration::Client(ClientConfiguration {
            ssid: network
                .wifi_ssid
                .as_str()
                .try_into()
                .map_err(|_| anyhow!("wifi ssid too long"))?,
            password: network
                .wifi_pass
                .as_str()
                .try_into()
                .map_err(|_| anyhow!("wifi password too long"))?,
            auth_method,
            ..Default::default()
        }))?;

        if wifi.is_started()? {
            let _ = wifi.disconnect();
        } else {
            wifi.start()?;
        }
        wifi.connect()?;

        for _ in 0..config.wifi_connect_attempts {
            if wifi.is_up()? {
                return Ok(true);
            }
            FreeRtos::delay_ms(config.wifi_poll_interval_ms as u32);
        }
        Ok(false)
    })();

    match outcome {
        Ok(true) => {
            let ip = wifi
                .sta_netif()
                .get_ip_info()
                .map(|ip_info| ip_info.ip.to_string())
                .unwrap_or_else(|_| "0.0.0.0".to_string());
            info!("WiFi connected, IP: {ip}");
            if let Err(err) = oled.connected(&ip) {
                warn!("connected screen draw failed: {err:#}");
            }
            FreeRtos::delay_ms(config.boot_banner_ms as u32);
            true
        }
        Ok(false) => {
            warn!("WiFi connection failed after {} attempts", config.wifi_connect_attempts);
            if let Err(err) = oled.show_error("WiFi Failed") {
                warn!("error screen draw failed: {err:#}");
            }
            FreeRtos::delay_ms(config.error_hold_ms as u32);
            false
        }
        Err(err) => {
            warn!("wifi setup failed: {err:#}");
            if let Err(err) = oled.show_error("WiFi Failed") {
                warn!("error screen draw failed: {err:#}");
            }
            FreeRtos::delay_ms(config.error_hold_ms as u32);
            false
        }
    }
}

// Best-effort, at most once per scheduled tick. A down link aborts the cycle
// (the reading is dropped) and reconnects inline, blocking the whole loop.
fn upload(
    wifi: &mut EspWifi<'static>,
    network: &NetworkConfig,
    config: &MeterConfig,
    oled: &mut Oled,
    reading: &Reading,
) {
    if !wifi.is_up().unwrap_or(false) {
        warn!("WiFi not connected, reconnecting...");
        connect_wifi(wifi, network, config, oled);
        return;
    }

    if let Err(err) = post_reading(network, config, reading) {
        warn!("upload failed: {err:#}");
    }
}

fn post_reading(network: &NetworkConfig, config: &MeterConfig, reading: &Reading) -> Result<()> {
    let payload = payload_json(reading);

    info!("--- Sending data to server ---");
    info!("URL: {}", network.upload_url);
    info!("Payload: {payload}");

    let connection = EspHttpConnection::new(&HttpClientConfiguration {
        timeout: Some(Duration::from_millis(config.http_timeout_ms)),
        crt_bundle_attach: Some(esp_idf_svc::sys::esp_crt_bundle_attach),
        ..Default::default()
    })?;
    let mut client = HttpClient::wrap(connection);

    let headers = [
        ("Content-Type", "application/json"),
        ("X-API-Key", network.api_key.as_str()),
    ];
    let mut request = client.post(&network.upload_url, &headers)?;
    request.write_all(payload.as_bytes())?;
    let mut response = request.submit().map_err(|err| anyhow!("{err:?}"))?;

    let status = response.status();
    let mut body = Vec::new();
    let mut chunk = [0_u8; 256];
    loop {
        let read = response.read(&mut chunk).map_err(|err| anyhow!("{err:?}"))?;
        if read == 0 {
            break;
        }
        body.extend_from_slice(&chunk[..read]);
        // The body is logged for observability only, never parsed.
        if body.len() >= MAX_RESPONSE_LOG {
            break;
        }
    }

    info!("Response code: {status}");
    info!("Response: {}", String::from_utf8_lossy(&body));

    if !(200..300).contains(&status) {
        return Err(anyhow!("server returned HTTP {status}"));
    }
    Ok(())
}
