use embassy_executor::Spawner;
use ember_rs::config::{self, MonitorProfile};
use ember_rs::controller::HeaterController;
use esp_idf_svc::eventloop::EspSystemEventLoop;
use esp_idf_svc::hal::prelude::Peripherals;
use esp_idf_svc::nvs::EspDefaultNvsPartition;
use esp_idf_svc::sntp::EspSntp;
use esp_idf_svc::wifi::{
    AccessPointConfiguration, AuthMethod, BlockingWifi, Configuration, EspWifi,
};
use log::{info, warn};

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    // It is necessary to call this function once. Otherwise some patches to the runtime
    // implemented by esp-idf-sys might not link properly. See https://github.com/esp-rs/esp-idf-template/issues/71
    esp_idf_svc::sys::link_patches();

    // Bind the log crate to the ESP Logging facilities
    esp_idf_svc::log::EspLogger::initialize_default();

    info!("Starting heater status sign");

    let peripherals = Peripherals::take().unwrap();
    let nvs = EspDefaultNvsPartition::take().unwrap();
    let sys_loop = EspSystemEventLoop::take().unwrap();

    // The plug joins our AP and pushes samples; without Wi-Fi the monitor
    // still runs and the sign settles on UNKNOWN like any other signal loss.
    let wifi = match start_access_point(peripherals.modem, nvs, sys_loop) {
        Ok(wifi) => Some(wifi),
        Err(e) => {
            warn!("Wi-Fi AP failed: {:?} - running without ingestion", e);
            None
        }
    };

    // Best-effort clock sync for the display schedule; unsynced deployments
    // fail open to always-visible.
    let _sntp = match EspSntp::new_default() {
        Ok(sntp) => Some(sntp),
        Err(e) => {
            warn!("SNTP start failed: {:?} - schedule will fail open", e);
            None
        }
    };

    let profile = MonitorProfile::from_build_env();
    info!(
        "Monitor profile: heating >= {:.2} A, maintaining >= {:.2} A",
        profile.heating_threshold_a, profile.maintaining_threshold_a
    );

    let mut controller = HeaterController::new(profile);
    controller.set_wifi_ready(wifi.is_some()).await;

    if let Err(e) = controller.start(spawner).await {
        log::error!("Controller start failed: {:?}", e);
    }
}

fn start_access_point(
    modem: esp_idf_svc::hal::modem::Modem,
    nvs: EspDefaultNvsPartition,
    sys_loop: EspSystemEventLoop,
) -> Result<BlockingWifi<EspWifi<'static>>, Box<dyn std::error::Error>> {
    let wifi = EspWifi::new(modem, sys_loop.clone(), Some(nvs))?;
    let mut wifi = BlockingWifi::wrap(wifi, sys_loop)?;

    wifi.set_configuration(&Configuration::AccessPoint(AccessPointConfiguration {
        ssid: config::AP_SSID
            .try_into()
            .map_err(|_| "AP SSID too long")?,
        password: config::AP_PASSWORD
            .try_into()
            .map_err(|_| "AP password too long")?,
        auth_method: AuthMethod::WPAWPA2Personal,
        channel: 1,
        ..Default::default()
    }))?;

    wifi.start()?;
    wifi.wait_netif_up()?;

    info!(
        "AP `{}` up - point the plug at http://192.168.71.1/current",
        config::AP_SSID
    );
    Ok(wifi)
}
