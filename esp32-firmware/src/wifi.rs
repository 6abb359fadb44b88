use anyhow::{anyhow, Result};
use esp_idf_hal::modem::Modem;
use esp_idf_svc::{
    eventloop::EspSystemEventLoop,
    nvs::EspDefaultNvsPartition,
    wifi::{ClientConfiguration, Configuration, EspWifi},
};
use std::net::Ipv4Addr;
use turret_link::services::NetworkAssociation;

use crate::{debug, info, warn};

/// The station interface of the on-chip radio
pub struct StationRadio {
    wifi: EspWifi<'static>,
}

impl StationRadio {
    pub fn new(
        modem: Modem,
        sysloop: EspSystemEventLoop,
        nvs: EspDefaultNvsPartition,
    ) -> Result<Self> {
        let wifi = EspWifi::new(modem, sysloop, Some(nvs))?;
        info!("Radio initialized");
        Ok(Self { wifi })
    }
}

impl NetworkAssociation for StationRadio {
    fn set_hostname(&mut self, hostname: &str) -> Result<()> {
        self.wifi.sta_netif_mut().set_hostname(hostname)?;
        Ok(())
    }

    fn begin(&mut self, network_name: &str, passphrase: &str) -> Result<()> {
        if self.wifi.is_started()? {
            // Drop whatever we were on before switching networks
            if let Err(e) = self.wifi.disconnect() {
                debug!("Disconnect before join failed: {}", e);
            }
        }

        let client = ClientConfiguration {
            ssid: network_name
                .try_into()
                .map_err(|_| anyhow!("network name too long"))?,
            password: passphrase
                .try_into()
                .map_err(|_| anyhow!("passphrase too long"))?,
            ..Default::default()
        };
        self.wifi
            .set_configuration(&Configuration::Client(client))?;

        if !self.wifi.is_started()? {
            self.wifi.start()?;
            info!("Station started");
        }
        self.wifi.connect()?;
        Ok(())
    }

    fn is_associated(&mut self) -> bool {
        match self.wifi.is_up() {
            Ok(up) => up,
            Err(e) => {
                warn!("Could not query station: {}", e);
                false
            }
        }
    }

    fn local_address(&mut self) -> Option<Ipv4Addr> {
        let info = self.wifi.sta_netif().get_ip_info().ok()?;
        (!info.ip.is_unspecified()).then_some(info.ip)
    }
}
