//! Per-opcode execution statistics

use super::instructions::Opcode;

/// Clock and instruction counts, per opcode
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Statistics {
    clocks: [u64; 8],
    counts: [u64; 8],
}

impl Statistics {
    /// Account for one executed instruction
    pub fn record(&mut self, opcode: Opcode, clocks: u64) {
        self.clocks[opcode.index()] += clocks;
        self.counts[opcode.index()] += 1;
    }

    /// Clock cycles spent on an opcode
    #[must_use]
    pub const fn clocks(&self, opcode: Opcode) -> u64 {
        self.clocks[opcode.index()]
    }

    /// Number of instructions executed with an opcode
    #[must_use]
    pub const fn count(&self, opcode: Opcode) -> u64 {
        self.counts[opcode.index()]
    }

    #[must_use]
    pub fn total_clocks(&self) -> u64 {
        self.clocks.iter().sum()
    }

    #[must_use]
    pub fn total_instructions(&self) -> u64 {
        self.counts.iter().sum()
    }

    /// Average clocks per instruction, `None` if nothing was executed
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn average_cpi(&self) -> Option<f64> {
        match self.total_instructions() {
            0 => None,
            instructions => Some(self.total_clocks() as f64 / instructions as f64),
        }
    }
}

impl std::fmt::Display for Statistics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for opcode in Opcode::ALL {
            writeln!(
                f,
                "{} {} instructions executed, using {} clocks",
                self.count(opcode),
                opcode,
                self.clocks(opcode)
            )?;
        }
        writeln!(f, "{}", "-".repeat(54))?;
        writeln!(
            f,
            "{} total instructions executed, using {} clocks",
            self.total_instructions(),
            self.total_clocks()
        )?;
        match self.average_cpi() {
            Some(cpi) => write!(f, "Average CPI = {cpi:.2}"),
            None => write!(f, "Average CPI = n/a"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn record_test() {
        let mut stats = Statistics::default();
        assert_eq!(stats.average_cpi(), None);

        stats.record(Opcode::Tad, 2);
        stats.record(Opcode::Tad, 4);
        stats.record(Opcode::Opr, 1);
        stats.record(Opcode::Iot, 0);

        assert_eq!(stats.count(Opcode::Tad), 2);
        assert_eq!(stats.clocks(Opcode::Tad), 6);
        assert_eq!(stats.count(Opcode::Iot), 1);
        assert_eq!(stats.clocks(Opcode::Iot), 0);
        assert_eq!(stats.count(Opcode::And), 0);
        assert_eq!(stats.total_instructions(), 4);
        assert_eq!(stats.total_clocks(), 7);
        assert_eq!(stats.average_cpi(), Some(1.75));
    }

    #[test]
    fn report_test() {
        let mut stats = Statistics::default();
        stats.record(Opcode::And, 3);
        stats.record(Opcode::Opr, 1);

        insta::assert_snapshot!(stats.to_string(), @r###"
        1 AND instructions executed, using 3 clocks
        0 TAD instructions executed, using 0 clocks
        0 ISZ instructions executed, using 0 clocks
        0 DCA instructions executed, using 0 clocks
        0 JMS instructions executed, using 0 clocks
        0 JMP instructions executed, using 0 clocks
        0 IOT instructions executed, using 0 clocks
        1 OPR instructions executed, using 1 clocks
        ------------------------------------------------------
        2 total instructions executed, using 4 clocks
        Average CPI = 2.00
        "###);
    }

    #[test]
    fn empty_report_test() {
        let report = Statistics::default().to_string();
        assert!(report.ends_with("0 total instructions executed, using 0 clocks\nAverage CPI = n/a"));
    }
}
