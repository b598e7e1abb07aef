use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};

/// Buffer circulaire multi-canal, « fenêtre la plus fraîche ».
///
/// Bridges the hardware input callback (single producer) and the analysis
/// tick (any number of readers). Samples are stored as `f32` bits in atomic
/// cells and a monotonically advancing frame cursor publishes each write, so
/// neither side ever takes a lock: the producer never waits on a reader and
/// a reader never waits on the producer.
///
/// Writes overwrite the oldest frames once `capacity` is exceeded. Reads are
/// non-destructive and always return the most recent frames, oldest first,
/// zero-padded when fewer frames were ever written. A read that races a write
/// may observe part of the newer block (torn read); that is acceptable for
/// display and classification.
///
/// # Example
/// ```
/// use es_audio::ring::RingBuffer;
/// let ring = RingBuffer::new(1, 4);
/// ring.write(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0], 1);
/// assert_eq!(ring.read(4), vec![3.0, 4.0, 5.0, 6.0]);
/// assert_eq!(ring.read(2), vec![5.0, 6.0]);
/// ```
pub struct RingBuffer {
    channels: usize,
    capacity: usize,
    /// Frame-major cells: `slot * channels + channel`.
    cells: Box<[AtomicU32]>,
    /// Frames ever written.
    written: AtomicUsize,
}

impl RingBuffer {
    /// Create a buffer holding `capacity` frames of `channels` samples.
    ///
    /// All allocation happens here; `write` and `read_channel_into` never
    /// allocate.
    ///
    /// # Panics
    /// Panics if `channels` or `capacity` is 0.
    #[must_use]
    pub fn new(channels: usize, capacity: usize) -> Self {
        assert!(channels > 0, "RingBuffer needs at least one channel");
        assert!(capacity > 0, "RingBuffer capacity must be > 0");

        let cells = (0..channels * capacity)
            .map(|_| AtomicU32::new(0.0f32.to_bits()))
            .collect();

        Self {
            channels,
            capacity,
            cells,
            written: AtomicUsize::new(0),
        }
    }

    /// Channels stored per frame.
    #[inline]
    #[must_use]
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Frames retained.
    #[inline]
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Frames written since creation.
    #[inline]
    #[must_use]
    pub fn total_written(&self) -> usize {
        self.written.load(Ordering::Acquire)
    }

    /// Append an interleaved block of `channel_count` channels.
    ///
    /// Incoming channels map one-to-one onto stored channels; extra incoming
    /// channels are dropped and missing ones repeat the last incoming channel
    /// (a mono microphone fills every stored channel). A trailing partial
    /// frame is ignored.
    ///
    /// Real-time safe: no allocation, no lock, bounded by the block length.
    /// Only one thread may write at a time.
    pub fn write(&self, samples: &[f32], channel_count: usize) {
        if channel_count == 0 {
            return;
        }
        let frames = samples.len() / channel_count;
        if frames == 0 {
            return;
        }

        let start = self.written.load(Ordering::Relaxed);
        // Frames older than one capacity would be overwritten in this same call.
        let skip = frames.saturating_sub(self.capacity);

        for frame in skip..frames {
            let slot = (start + frame) % self.capacity;
            let src = &samples[frame * channel_count..(frame + 1) * channel_count];
            let dst = &self.cells[slot * self.channels..(slot + 1) * self.channels];
            for (ch, cell) in dst.iter().enumerate() {
                let sample = src[ch.min(channel_count - 1)];
                cell.store(sample.to_bits(), Ordering::Relaxed);
            }
        }

        self.written.store(start + frames, Ordering::Release);
    }

    /// Copy the `out.len()` most recent samples of `channel` into `out`,
    /// oldest first, zero-padding at the front.
    ///
    /// Requests longer than `capacity` are zero-padded too. An out-of-range
    /// channel reads as silence.
    pub fn read_channel_into(&self, channel: usize, out: &mut [f32]) {
        if channel >= self.channels {
            out.fill(0.0);
            return;
        }

        let end = self.written.load(Ordering::Acquire);
        let take = out.len().min(end).min(self.capacity);
        let pad = out.len() - take;

        out[..pad].fill(0.0);
        for (i, slot_out) in out[pad..].iter_mut().enumerate() {
            let slot = (end - take + i) % self.capacity;
            let bits = self.cells[slot * self.channels + channel].load(Ordering::Relaxed);
            *slot_out = f32::from_bits(bits);
        }
    }

    /// The `count` most recent frames, interleaved, oldest first.
    ///
    /// Returns `count × channels` samples, zero-filled where nothing was
    /// written yet. Allocates; the analysis tick uses `read_channel_into`.
    ///
    /// # Example
    /// ```
    /// use es_audio::ring::RingBuffer;
    /// let ring = RingBuffer::new(2, 8);
    /// assert_eq!(ring.read(3), vec![0.0; 6]);
    /// ring.write(&[0.1, 0.2], 2);
    /// assert_eq!(ring.read(2), vec![0.0, 0.0, 0.1, 0.2]);
    /// ```
    #[must_use]
    pub fn read(&self, count: usize) -> Vec<f32> {
        let mut out = vec![0.0; count * self.channels];

        let end = self.written.load(Ordering::Acquire);
        let take = count.min(end).min(self.capacity);
        let pad = count - take;

        for i in 0..take {
            let slot = (end - take + i) % self.capacity;
            let base = (pad + i) * self.channels;
            for ch in 0..self.channels {
                let bits = self.cells[slot * self.channels + ch].load(Ordering::Relaxed);
                out[base + ch] = f32::from_bits(bits);
            }
        }
        out
    }
}
