//! Output channels and sinks
//!
//! A run hands every output step to an [`OutputSink`] as one snapshot per
//! [`Channel`]. Velocity, pressure, pressure gradient and temperature are
//! written non-dimensional; viscosity (Pa·s), melt velocity (m/s) and the
//! densities (kg/m³) are dimensional.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use crate::error::Result;
use crate::fem::CoupledSpaces;
use crate::mesh::{FieldSnapshot, FieldState, Mesh, ScalarField, VectorField};

/// Recorded quantities
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Channel {
    Temperature,
    Viscosity,
    Velocity,
    PressureGradient,
    Pressure,
    MeltVelocity,
    SolidDensity,
    FluidTemperature,
    DensityContrast,
}

impl Channel {
    pub const ALL: [Channel; 9] = [
        Channel::Temperature,
        Channel::Viscosity,
        Channel::Velocity,
        Channel::PressureGradient,
        Channel::Pressure,
        Channel::MeltVelocity,
        Channel::SolidDensity,
        Channel::FluidTemperature,
        Channel::DensityContrast,
    ];

    /// File stem used by file sinks
    pub fn name(&self) -> &'static str {
        match self {
            Channel::Temperature => "temperature",
            Channel::Viscosity => "viscosity",
            Channel::Velocity => "velocity",
            Channel::PressureGradient => "pressure_gradient",
            Channel::Pressure => "pressure",
            Channel::MeltVelocity => "melt_velocity",
            Channel::SolidDensity => "solid_density",
            Channel::FluidTemperature => "fluid_temperature",
            Channel::DensityContrast => "density_contrast",
        }
    }

    /// Snapshot of this channel from the current state
    ///
    /// `mu_a` converts the stored non-dimensional viscosity to Pa·s.
    pub fn snapshot(&self, mesh: &Mesh, spaces: &CoupledSpaces, state: &FieldState, mu_a: f64) -> FieldSnapshot {
        let p2 = &spaces.velocity;
        let p1 = &spaces.temperature;
        let name = self.name();
        match self {
            Channel::Velocity => FieldSnapshot::Vector(VectorField::from_space(name, mesh, p2, &state.velocity, 1.0)),
            Channel::PressureGradient => {
                FieldSnapshot::Vector(VectorField::from_space(name, mesh, p2, &state.pressure_gradient, 1.0))
            }
            Channel::MeltVelocity => {
                FieldSnapshot::Vector(VectorField::from_space(name, mesh, p2, &state.melt_velocity, 1.0))
            }
            Channel::Temperature => FieldSnapshot::Scalar(ScalarField::from_space(name, mesh, p1, &state.temperature, 1.0)),
            Channel::Viscosity => FieldSnapshot::Scalar(ScalarField::from_space(name, mesh, p1, &state.viscosity, mu_a)),
            Channel::Pressure => {
                FieldSnapshot::Scalar(ScalarField::from_space(name, mesh, &spaces.pressure, &state.pressure, 1.0))
            }
            Channel::SolidDensity => {
                FieldSnapshot::Scalar(ScalarField::from_space(name, mesh, p1, &state.solid_density, 1.0))
            }
            Channel::FluidTemperature => {
                FieldSnapshot::Scalar(ScalarField::from_space(name, mesh, p1, &state.fluid_temperature, 1.0))
            }
            Channel::DensityContrast => {
                FieldSnapshot::Scalar(ScalarField::from_space(name, mesh, p1, &state.density_contrast, 1.0))
            }
        }
    }
}

/// Receiver of output frames
pub trait OutputSink {
    fn record(&mut self, channel: Channel, time: f64, snapshot: &FieldSnapshot) -> Result<()>;

    /// Flush buffered data; called once when a run ends
    fn finish(&mut self) -> Result<()> {
        Ok(())
    }
}

/// Keeps every frame in memory, keyed by channel
#[derive(Debug, Default)]
pub struct MemorySink {
    series: BTreeMap<Channel, Vec<(f64, FieldSnapshot)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn series(&self, channel: Channel) -> &[(f64, FieldSnapshot)] {
        self.series.get(&channel).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Output times of a channel
    pub fn times(&self, channel: Channel) -> Vec<f64> {
        self.series(channel).iter().map(|(t, _)| *t).collect()
    }

    /// Total number of frames over all channels
    pub fn len(&self) -> usize {
        self.series.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl OutputSink for MemorySink {
    fn record(&mut self, channel: Channel, time: f64, snapshot: &FieldSnapshot) -> Result<()> {
        self.series.entry(channel).or_default().push((time, snapshot.clone()));
        Ok(())
    }
}

/// Discards every frame
#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl OutputSink for NullSink {
    fn record(&mut self, _channel: Channel, _time: f64, _snapshot: &FieldSnapshot) -> Result<()> {
        Ok(())
    }
}

/// One CSV file per channel under the run directory
///
/// Rows are `time,x,y,value` for scalar channels and `time,x,y,vx,vy` for
/// vector channels. Files are truncated when the sink is created.
pub struct CsvSink {
    directory: PathBuf,
    writers: BTreeMap<Channel, BufWriter<File>>,
}

impl CsvSink {
    pub fn new<P: AsRef<Path>>(directory: P) -> Result<Self> {
        let directory = directory.as_ref().to_path_buf();
        fs::create_dir_all(&directory)?;
        for channel in Channel::ALL {
            let path = directory.join(format!("{}.csv", channel.name()));
            if path.exists() {
                fs::remove_file(&path)?;
            }
        }
        Ok(Self {
            directory,
            writers: BTreeMap::new(),
        })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    fn writer(&mut self, channel: Channel, snapshot: &FieldSnapshot) -> Result<&mut BufWriter<File>> {
        let writer = match self.writers.entry(channel) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let path = self.directory.join(format!("{}.csv", channel.name()));
                let file = OpenOptions::new().create(true).append(true).open(path)?;
                let mut writer = BufWriter::new(file);
                match snapshot {
                    FieldSnapshot::Scalar(_) => writeln!(writer, "time,x,y,value")?,
                    FieldSnapshot::Vector(_) => writeln!(writer, "time,x,y,vx,vy")?,
                }
                entry.insert(writer)
            }
        };
        Ok(writer)
    }
}

impl OutputSink for CsvSink {
    fn record(&mut self, channel: Channel, time: f64, snapshot: &FieldSnapshot) -> Result<()> {
        let writer = self.writer(channel, snapshot)?;
        match snapshot {
            FieldSnapshot::Scalar(f) => {
                for (p, v) in f.points.iter().zip(f.data.iter()) {
                    writeln!(writer, "{:e},{:e},{:e},{:e}", time, p.x, p.y, v)?;
                }
            }
            FieldSnapshot::Vector(f) => {
                for (p, v) in f.points.iter().zip(f.data.iter()) {
                    writeln!(writer, "{:e},{:e},{:e},{:e},{:e}", time, p.x, p.y, v.x, v.y)?;
                }
            }
        }
        Ok(())
    }

    fn finish(&mut self) -> Result<()> {
        for writer in self.writers.values_mut() {
            writer.flush()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh_generator::MeshGenerator;
    use nalgebra::Point2;

    fn scalar(values: &[f64]) -> FieldSnapshot {
        let points = (0..values.len()).map(|i| Point2::new(i as f64, 0.0)).collect();
        FieldSnapshot::Scalar(ScalarField::new("temperature", points, values.to_vec()))
    }

    #[test]
    fn test_memory_sink_keeps_series() {
        let mut sink = MemorySink::new();
        sink.record(Channel::Temperature, 0.0, &scalar(&[1.0, 2.0])).unwrap();
        sink.record(Channel::Temperature, 0.5, &scalar(&[1.5, 2.5])).unwrap();
        sink.record(Channel::Pressure, 0.5, &scalar(&[0.0])).unwrap();

        assert_eq!(sink.len(), 3);
        assert_eq!(sink.times(Channel::Temperature), vec![0.0, 0.5]);
        assert!(sink.series(Channel::Viscosity).is_empty());
    }

    #[test]
    fn test_csv_sink_writes_one_file_per_channel() {
        let dir = tempfile::tempdir().unwrap();
        let mut sink = CsvSink::new(dir.path().join("run")).unwrap();
        sink.record(Channel::Temperature, 0.0, &scalar(&[1.0, 2.0])).unwrap();
        sink.record(Channel::Temperature, 1.0, &scalar(&[3.0, 4.0])).unwrap();
        sink.finish().unwrap();

        let text = fs::read_to_string(dir.path().join("run/temperature.csv")).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "time,x,y,value");
        assert_eq!(lines.len(), 5);
        assert!(!dir.path().join("run/pressure.csv").exists());
    }

    #[test]
    fn test_snapshots_cover_every_channel() {
        let mesh = MeshGenerator::rectangle(1.0, 0.4, 4, 2).unwrap();
        let spaces = CoupledSpaces::new(&mesh);
        let mut state = FieldState::new(&spaces);
        state.viscosity.iter_mut().for_each(|m| *m = 2.0);

        for channel in Channel::ALL {
            let snap = channel.snapshot(&mesh, &spaces, &state, 5e21);
            assert_eq!(snap.name(), channel.name());
            assert!(snap.is_finite());
            let expected = match snap {
                FieldSnapshot::Vector(_) => spaces.velocity.num_base_dofs(),
                FieldSnapshot::Scalar(_) => spaces.temperature.num_base_dofs(),
            };
            assert_eq!(snap.len(), expected);
        }

        match Channel::Viscosity.snapshot(&mesh, &spaces, &state, 5e21) {
            FieldSnapshot::Scalar(f) => assert_eq!(f.max_abs(), 1e22),
            FieldSnapshot::Vector(_) => panic!("viscosity is scalar"),
        }
    }
}
