//! Adapters: concrete implementations of the hexagonal port traits.
//!
//! | Adapter     | Implements             | Connects to                 |
//! |-------------|------------------------|-----------------------------|
//! | `hardware`  | SamplePort, RelayPort  | HX711 load cell, relay GPIO |
//! |             | IrqGate                | DOUT data-ready interrupt   |
//! | `log_sink`  | EventSink              | Serial log output           |
//! | `nvs`       | RegionPort             | NVS blob / in-memory region |
//! | `time`      | Clock                  | ESP32 system timer          |
//! | `http`      | -                      | route table for the server  |
//! | `console`   | -                      | serial command parser       |

pub mod console;
pub mod hardware;
pub mod http;
pub mod log_sink;
pub mod nvs;
pub mod time;
