use anyhow::{Context, Result};
use jack::{AudioOut, Client, Port, ProcessScope};

pub const LEFT_PORT: &str = "out_left";
pub const RIGHT_PORT: &str = "out_right";

pub struct Ports {
    output_left: Port<AudioOut>,
    output_right: Port<AudioOut>,
}

impl Ports {
    pub fn new(client: &Client) -> Result<Self> {
        Ok(Self {
            output_left: client
                .register_port(LEFT_PORT, AudioOut::default())
                .context("failed to register out port left")?,
            output_right: client
                .register_port(RIGHT_PORT, AudioOut::default())
                .context("failed to register out port right")?,
        })
    }

    /// Split an interleaved stereo block across the two output ports.
    pub fn write_output(&mut self, ps: &ProcessScope, samples: &[f32]) {
        let out_left = self.output_left.as_mut_slice(ps);
        let out_right = self.output_right.as_mut_slice(ps);
        deinterleave(samples, out_left, out_right);
    }

    pub fn silence_output(&mut self, ps: &ProcessScope) {
        self.output_left.as_mut_slice(ps).fill(0.0);
        self.output_right.as_mut_slice(ps).fill(0.0);
    }
}

/// Frames missing from `samples` are written as silence.
pub fn deinterleave(samples: &[f32], left: &mut [f32], right: &mut [f32]) {
    let mut frames = samples.chunks_exact(2);

    for (l, r) in left.iter_mut().zip(right.iter_mut()) {
        let (a, b) = frames.next().map_or((0.0, 0.0), |f| (f[0], f[1]));
        *l = a;
        *r = b;
    }
}
