pub mod pusher {
    use anyhow::{bail, Result};
    use reqwest::header::USER_AGENT;
    use serde::Serialize;

    use base64::{engine::general_purpose, Engine as _};

    /// Credentials for one Tidbyt device.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub struct TidbytDevice {
        pub id: String,
        pub key: String,
    }

    #[derive(Serialize, Debug)]
    struct TidbytPayload {
        #[serde(rename = "deviceID")]
        device_id: String,
        #[serde(rename = "installationID")]
        installation_id: String,
        image: String,
        background: bool,
    }

    pub fn endpoint(device: &TidbytDevice) -> String {
        format!("https://api.tidbyt.com/v0/devices/{}/push", device.id)
    }

    /// Push an encoded WebP to the device as the `sunset` installation.
    pub async fn push(client: &reqwest::Client, device: &TidbytDevice, file_contents: &[u8]) -> Result<()> {
        let payload = TidbytPayload {
            device_id: device.id.clone(),
            image: general_purpose::STANDARD.encode(file_contents),
            installation_id: "sunset".into(),
            background: true,
        };

        let resp = client
            .post(endpoint(device))
            .bearer_auth(&device.key)
            .json(&payload)
            .header(USER_AGENT, "sunset-sky")
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            bail!("push to {} failed with {}: {}", device.id, status, body);
        }

        Ok(())
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn payload_uses_api_field_names() {
            let payload = TidbytPayload {
                device_id: "dev".into(),
                installation_id: "sunset".into(),
                image: general_purpose::STANDARD.encode([1u8, 2, 3]),
                background: true,
            };
            let json = serde_json::to_value(&payload).unwrap();
            assert_eq!(json["deviceID"], "dev");
            assert_eq!(json["installationID"], "sunset");
            assert_eq!(json["image"], "AQID");
            assert_eq!(json["background"], true);
        }

        #[test]
        fn endpoint_includes_device() {
            let device = TidbytDevice {
                id: "abc-123".into(),
                key: "k".into(),
            };
            assert_eq!(endpoint(&device), "https://api.tidbyt.com/v0/devices/abc-123/push");
        }
    }
}
