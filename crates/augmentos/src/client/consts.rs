pub const AUGMENTOS_API_KEY: &str = "AUGMENTOS_API_KEY";
pub const PACKAGE_NAME: &str = "PACKAGE_NAME";

pub const BASE_URL: &str = "wss://prod.augmentos.cloud";
pub const TPA_WS_PATH: &str = "/tpa-ws";
