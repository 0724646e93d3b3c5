// sensor.rs — 桌面端的设备方向数据源: 从 stdin 读取 "alpha beta gamma"
//
// 每行一个样本, 角度单位为度; "null" 或无法解析的分量视为缺失。

use std::io::BufRead;
use std::thread;

use crate::fusion::{OrientationSample, SensorMailbox};

fn parse_angle(token: Option<&str>) -> Option<f32> {
    token?.parse::<f32>().ok().filter(|v| v.is_finite())
}

/// `None` for blank lines and `#` comments.
pub fn parse_sample(line: &str) -> Option<OrientationSample> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return None;
    }

    let mut tokens = line.split(|c: char| c.is_whitespace() || c == ',').filter(|t| !t.is_empty());
    Some(OrientationSample {
        alpha: parse_angle(tokens.next()),
        beta: parse_angle(tokens.next()),
        gamma: parse_angle(tokens.next()),
    })
}

/// Reads samples from `reader` until EOF, pushing each into the mailbox.
/// Samples arriving while motion control is off are silently dropped.
pub fn pump_samples(reader: impl BufRead, mailbox: &SensorMailbox) -> usize {
    let mut accepted = 0;
    for line in reader.lines() {
        let Ok(line) = line else {
            break;
        };
        let Some(sample) = parse_sample(&line) else {
            continue;
        };
        if sample.to_orientation().is_none() {
            log::warn!("discarding incomplete orientation sample: {line:?}");
            continue;
        }
        if mailbox.push(sample) {
            accepted += 1;
        }
    }
    accepted
}

pub fn spawn_stdin_sensor(mailbox: SensorMailbox) -> std::io::Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("orientation-stdin".to_string())
        .spawn(move || {
            let stdin = std::io::stdin();
            let n = pump_samples(stdin.lock(), &mailbox);
            log::info!("orientation input closed after {n} samples");
        })
}
