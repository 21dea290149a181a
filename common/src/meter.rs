use crate::{
    config::MeterConfig,
    display::{DisplayPage, PageView},
    reading::{Reading, SensorSample},
};

#[derive(Debug, Clone, PartialEq)]
pub enum MeterAction {
    Render(PageView),
    Upload(Reading),
}

// The whole of the device's mutable state: latest reading, rotating page,
// and the two "last fired" timestamps. Owned by the single control thread.
#[derive(Debug)]
pub struct MeterEngine {
    config: MeterConfig,
    reading: Reading,
    page: DisplayPage,
    last_display_ms: u64,
    last_upload_ms: u64,
}

impl MeterEngine {
    pub fn new(config: MeterConfig) -> Self {
        Self {
            config,
            reading: Reading::default(),
            page: DisplayPage::Voltage,
            last_display_ms: 0,
            last_upload_ms: 0,
        }
    }

    pub fn reading(&self) -> Reading {
        self.reading
    }

    pub fn page(&self) -> DisplayPage {
        self.page
    }

    pub fn update_sample(&mut self, sample: SensorSample) {
        self.reading = Reading::from_sample(sample);
    }

    // Level check, not edge check: however many intervals elapsed since the
    // last tick, each domain fires at most once and the remainder is
    // dropped. Resetting to now (not last + interval) makes the cadence
    // fixed-interval, so drift accumulates by the action's own duration.
    pub fn tick(&mut self, now_ms: u64) -> Vec<MeterAction> {
        let mut actions = Vec::new();

        if now_ms.saturating_sub(self.last_display_ms) >= self.config.display_interval_ms {
            actions.push(MeterAction::Render(self.page.view(&self.reading)));
            self.last_display_ms = now_ms;
            self.page = self.page.next();
        }

        if now_ms.saturating_sub(self.last_upload_ms) >= self.config.upload_interval_ms {
            actions.push(MeterAction::Upload(self.reading));
            self.last_upload_ms = now_ms;
        }

        actions
    }
}
