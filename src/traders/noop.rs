//! Baseline trader that only observes the market

use anyhow::Result;

use super::{Trader, TraderContext};
use crate::Config;

/// Places nothing, cancels nothing. Useful as a control run: the resulting
/// report shows the pure synthesized market without trader interference.
#[derive(Debug, Default)]
pub struct NoopTrader;

pub fn create(_config: &Config) -> Result<Box<dyn Trader>> {
    Ok(Box::new(NoopTrader))
}

impl Trader for NoopTrader {
    fn name(&self) -> &'static str {
        "noop"
    }

    fn on_snapshot(&mut self, _ctx: &mut TraderContext) {}
}
