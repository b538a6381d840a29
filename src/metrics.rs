use crate::VehicleId;
use std::io::{self, Write};

/// Writes one benchmark CSV line per platoon member per tick.
///
/// The leader has no front vehicle, so its records carry `distance = -1`
/// and `relativeSpeed = 0` by convention.
pub struct MetricsWriter<W: Write> {
    out: W,
}

impl<W: Write> MetricsWriter<W> {
    /// Creates a writer and emits the header line.
    pub fn new(mut out: W) -> io::Result<Self> {
        writeln!(out, "nodeId,time,distance,relativeSpeed,speed,acceleration")?;
        Ok(Self { out })
    }

    /// Records one member's state at the given simulation time.
    pub fn record(
        &mut self,
        vehicle: &VehicleId,
        time: f64,
        distance: f64,
        rel_speed: f64,
        speed: f64,
        acceleration: f64,
    ) -> io::Result<()> {
        writeln!(
            self.out,
            "{vehicle},{time},{distance},{rel_speed},{speed},{acceleration}"
        )
    }

    /// Flushes and returns the underlying sink.
    pub fn into_inner(mut self) -> io::Result<W> {
        self.out.flush()?;
        Ok(self.out)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn writes_header_and_records() {
        let mut writer = MetricsWriter::new(Vec::new()).unwrap();
        writer
            .record(&VehicleId::from("v1"), 12.3, -1.0, 0.0, 9.8, 0.5)
            .unwrap();
        writer
            .record(&VehicleId::from("v2"), 12.3, 4.2, -0.1, 9.7, 0.4)
            .unwrap();

        let out = String::from_utf8(writer.into_inner().unwrap()).unwrap();
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(
            lines,
            [
                "nodeId,time,distance,relativeSpeed,speed,acceleration",
                "v1,12.3,-1,0,9.8,0.5",
                "v2,12.3,4.2,-0.1,9.7,0.4",
            ]
        );
    }
}
