//! Filter worker - angle measurement and smoothing on a background task
//!
//! Frames go in through a `watch` channel, so a frame that arrives while the
//! worker is busy overwrites the pending one instead of queueing behind it.
//! Results come back on an `mpsc` channel. Reset and shutdown use their own
//! channel so they can never be overwritten by a frame.

use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

use kinex_angle::{AngleEngine, AngleEngineConfig};
use kinex_core::{AngleSample, JointType, KinexError, KinexResult, PoseFrame, Side};

use crate::{FilterBank, FilterKind};

/// One landmark snapshot and the joints to measure on it
#[derive(Debug, Clone)]
pub struct FrameRequest {
    /// Caller-assigned sequence number, echoed in the response
    pub sequence: u64,
    pub frame: PoseFrame,
    pub targets: Vec<(JointType, Side)>,
}

/// One measured joint
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilteredAngle {
    pub joint: JointType,
    pub side: Side,
    /// Unfiltered sample from the angle engine
    pub raw: AngleSample,
    /// Filter output, `None` for zero-confidence samples which are not fed
    /// to the filter
    pub smoothed: Option<f32>,
}

/// Result for one processed request
#[derive(Debug, Clone, PartialEq)]
pub struct FrameResponse {
    pub sequence: u64,
    /// Targets whose landmarks were missing are absent
    pub angles: Vec<FilteredAngle>,
}

impl FrameResponse {
    pub fn get(&self, joint: JointType, side: Side) -> Option<&FilteredAngle> {
        self.angles
            .iter()
            .find(|a| a.joint == joint && a.side == side)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Control {
    Reset,
    Shutdown,
}

/// Worker configuration
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FilterWorkerConfig {
    pub engine: AngleEngineConfig,
    pub filter: FilterKind,
    /// Capacity of the response channel
    pub response_buffer: usize,
}

impl Default for FilterWorkerConfig {
    fn default() -> Self {
        FilterWorkerConfig {
            engine: AngleEngineConfig::default(),
            filter: FilterKind::Kalman,
            response_buffer: 8,
        }
    }
}

/// Measure and smooth every target of one request
pub fn process_request(
    engine: &AngleEngine,
    bank: &mut FilterBank,
    request: &FrameRequest,
) -> FrameResponse {
    let angles = request
        .targets
        .iter()
        .filter_map(|&(joint, side)| {
            let raw = engine.measure(&request.frame, joint, side)?;
            let smoothed = if raw.confidence > 0.0 {
                Some(bank.filter(joint, side, raw.angle))
            } else {
                None
            };
            Some(FilteredAngle {
                joint,
                side,
                raw,
                smoothed,
            })
        })
        .collect();

    FrameResponse {
        sequence: request.sequence,
        angles,
    }
}

/// Spawns the filter task
pub struct FilterWorker;

impl FilterWorker {
    /// Start the worker on the current tokio runtime
    pub fn spawn(config: FilterWorkerConfig) -> KinexResult<FilterWorkerHandle> {
        let engine = AngleEngine::new(config.engine)?;
        let (frame_tx, frame_rx) = watch::channel(None);
        let (control_tx, control_rx) = mpsc::unbounded_channel();
        let (response_tx, response_rx) = mpsc::channel(config.response_buffer.max(1));

        let bank = FilterBank::new(config.filter);
        let task = tokio::spawn(run(engine, bank, frame_rx, control_rx, response_tx));

        Ok(FilterWorkerHandle {
            frames: frame_tx,
            control: control_tx,
            responses: response_rx,
            task,
        })
    }
}

async fn run(
    engine: AngleEngine,
    mut bank: FilterBank,
    mut frames: watch::Receiver<Option<FrameRequest>>,
    mut control: mpsc::UnboundedReceiver<Control>,
    responses: mpsc::Sender<FrameResponse>,
) {
    tracing::debug!("filter worker started");
    loop {
        tokio::select! {
            biased;

            cmd = control.recv() => match cmd {
                Some(Control::Reset) => bank.reset(),
                Some(Control::Shutdown) | None => break,
            },

            changed = frames.changed() => {
                if changed.is_err() {
                    break; // Handle dropped
                }
                let request = frames.borrow_and_update().clone();
                let Some(request) = request else { continue };

                let response = process_request(&engine, &mut bank, &request);
                if responses.send(response).await.is_err() {
                    break;
                }
            }
        }
    }
    tracing::debug!("filter worker stopped");
}

/// Owner side of a running worker
pub struct FilterWorkerHandle {
    frames: watch::Sender<Option<FrameRequest>>,
    control: mpsc::UnboundedSender<Control>,
    responses: mpsc::Receiver<FrameResponse>,
    task: JoinHandle<()>,
}

impl FilterWorkerHandle {
    /// Publish a frame. Replaces any frame the worker has not picked up yet.
    pub fn submit(&self, request: FrameRequest) -> KinexResult<()> {
        self.frames
            .send(Some(request))
            .map_err(|_| KinexError::WorkerStopped)
    }

    /// Discard all filter state before the next frame is processed
    pub fn reset(&self) -> KinexResult<()> {
        self.control
            .send(Control::Reset)
            .map_err(|_| KinexError::WorkerStopped)
    }

    /// Next response, `None` once the worker has stopped
    pub async fn recv(&mut self) -> Option<FrameResponse> {
        self.responses.recv().await
    }

    /// Non-blocking variant of [`recv`](Self::recv)
    pub fn try_recv(&mut self) -> Option<FrameResponse> {
        self.responses.try_recv().ok()
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Stop the worker and wait for it to exit
    pub async fn shutdown(self) {
        let _ = self.control.send(Control::Shutdown);
        if let Err(e) = self.task.await {
            tracing::warn!("filter worker join error: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kinex_core::landmark::*;
    use kinex_core::{Landmark, MotionTime};

    fn knee_frame(ankle_x: f32, ankle_y: f32, t_ms: i64) -> PoseFrame {
        let mut lms = vec![Landmark::new(0.5, 0.5, 0.0, 0.0); POSE_LANDMARK_COUNT];
        lms[LEFT_HIP] = Landmark::visible(0.5, 0.3, 0.0);
        lms[LEFT_KNEE] = Landmark::visible(0.5, 0.5, 0.0);
        lms[LEFT_ANKLE] = Landmark::visible(ankle_x, ankle_y, 0.0);
        PoseFrame::new(lms, MotionTime::from_millis(t_ms))
    }

    fn request(sequence: u64, frame: PoseFrame) -> FrameRequest {
        FrameRequest {
            sequence,
            frame,
            targets: vec![(JointType::Knee, Side::Left), (JointType::Knee, Side::Right)],
        }
    }

    #[test]
    fn test_process_request_skips_missing() {
        let engine = AngleEngine::new(AngleEngineConfig::flat()).unwrap();
        let mut bank = FilterBank::new(FilterKind::Kalman);

        let resp = process_request(&engine, &mut bank, &request(1, knee_frame(0.5, 0.7, 0)));
        assert_eq!(resp.sequence, 1);
        // Right leg landmarks are invisible
        assert_eq!(resp.angles.len(), 1);
        let knee = resp.get(JointType::Knee, Side::Left).unwrap();
        assert!((knee.raw.angle - 180.0).abs() < 0.1);
        assert_eq!(knee.smoothed, Some(knee.raw.angle));
    }

    #[test]
    fn test_degenerate_not_filtered() {
        let engine = AngleEngine::new(AngleEngineConfig::flat()).unwrap();
        let mut bank = FilterBank::new(FilterKind::Kalman);

        // Ankle on top of the knee
        let resp = process_request(&engine, &mut bank, &request(1, knee_frame(0.5, 0.5, 0)));
        let knee = resp.get(JointType::Knee, Side::Left).unwrap();
        assert_eq!(knee.raw.confidence, 0.0);
        assert_eq!(knee.smoothed, None);
        assert!(bank.is_empty());
    }

    #[tokio::test]
    async fn test_worker_round_trip() {
        let mut worker = FilterWorker::spawn(FilterWorkerConfig {
            engine: AngleEngineConfig::flat(),
            ..Default::default()
        })
        .unwrap();

        worker.submit(request(7, knee_frame(0.7, 0.5, 0))).unwrap();
        let resp = worker.recv().await.unwrap();
        assert_eq!(resp.sequence, 7);
        let knee = resp.get(JointType::Knee, Side::Left).unwrap();
        assert!((knee.raw.angle - 90.0).abs() < 0.1);

        worker.shutdown().await;
    }

    #[tokio::test]
    async fn test_worker_reset_reseeds() {
        let mut worker = FilterWorker::spawn(FilterWorkerConfig {
            engine: AngleEngineConfig::flat(),
            ..Default::default()
        })
        .unwrap();

        worker.submit(request(1, knee_frame(0.5, 0.7, 0))).unwrap();
        worker.recv().await.unwrap();

        worker.reset().unwrap();
        worker.submit(request(2, knee_frame(0.7, 0.5, 33))).unwrap();
        let resp = worker.recv().await.unwrap();
        let knee = resp.get(JointType::Knee, Side::Left).unwrap();
        // Fresh filter seeds from 90° instead of averaging with 180°
        assert!((knee.smoothed.unwrap() - 90.0).abs() < 0.1);

        worker.shutdown().await;
    }

    #[tokio::test]
    async fn test_submit_after_shutdown_fails() {
        let worker = FilterWorker::spawn(FilterWorkerConfig::default()).unwrap();
        worker.control.send(Control::Shutdown).unwrap();
        while worker.is_running() {
            tokio::task::yield_now().await;
        }

        let res = worker.submit(request(1, knee_frame(0.5, 0.7, 0)));
        assert_eq!(res, Err(KinexError::WorkerStopped));
        assert_eq!(worker.reset(), Err(KinexError::WorkerStopped));
    }
}
