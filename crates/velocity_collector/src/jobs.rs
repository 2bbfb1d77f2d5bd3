//! The job batcher.
//!
//! Work is grouped into job batches by (vendor, capture_type) so every
//! device in a batch shares the same command string, paging behavior and
//! prompt expectations. Prompt count is 1 for the login prompt plus one
//! per command sent - the mechanism that replaces timing heuristics.

use velocity_protocol::{normalize_name, CaptureType, Vendor};

#[derive(Debug, Clone, PartialEq)]
pub struct DeviceTarget {
    pub name: String,
    pub ip: String,
}

/// One job batch: every (device x command) pairing for a vendor and type.
#[derive(Debug, Clone)]
pub struct CollectionJob {
    pub vendor: Vendor,
    pub capture_type: CaptureType,
    /// Commands sent in order (paging disable first when the vendor needs
    /// one).
    pub commands: Vec<String>,
    /// Login prompt + one per command.
    pub prompt_count: usize,
    pub devices: Vec<DeviceTarget>,
}

impl CollectionJob {
    /// Display name used in job_start/job_complete events,
    /// e.g. "cisco_ios_configs".
    pub fn file_name(&self) -> String {
        format!("{}_{}", self.vendor, self.capture_type)
    }
}

/// Input device descriptor for the batcher: name, ip, resolved vendor.
#[derive(Debug, Clone)]
pub struct BatchDevice {
    pub name: String,
    pub ip: String,
    pub vendor: Vendor,
}

/// Group (device x capture_type) work into job batches. Pairs the vendor
/// has no command for are skipped; unknown-vendor devices run with no
/// paging prefix and the generic prompt.
pub fn build_jobs(devices: &[BatchDevice], types: &[CaptureType]) -> Vec<CollectionJob> {
    let mut jobs: Vec<CollectionJob> = Vec::new();

    for capture_type in types {
        for device in devices {
            let Some(command) = capture_type.command_for(device.vendor) else {
                continue;
            };
            let target = DeviceTarget {
                name: normalize_name(&device.name),
                ip: device.ip.clone(),
            };

            if let Some(job) = jobs
                .iter_mut()
                .find(|j| j.vendor == device.vendor && j.capture_type == *capture_type)
            {
                job.devices.push(target);
                continue;
            }

            let mut commands = Vec::new();
            if let Some(paging) = device.vendor.paging_disable() {
                commands.push(paging.to_string());
            }
            commands.push(command.to_string());
            let prompt_count = 1 + commands.len();
            jobs.push(CollectionJob {
                vendor: device.vendor,
                capture_type: *capture_type,
                commands,
                prompt_count,
                devices: vec![target],
            });
        }
    }

    jobs
}
