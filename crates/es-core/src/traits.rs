use crate::gesture::GestureLabel;

/// Reçoit le geste courant à chaque tick d'analyse.
///
/// Called from the analysis thread, once per tick, whether the label changed
/// or was reaffirmed.
///
/// CONTRAT : ne doit PAS bloquer. Forward the label to a channel or an atomic
/// and return; a slow observer delays the next tick.
///
/// Implemented for every `FnMut(GestureLabel) + Send`.
///
/// # Example
/// ```
/// use es_core::gesture::GestureLabel;
/// use es_core::traits::GestureObserver;
///
/// let mut seen = Vec::new();
/// {
///     let mut observer = |label: GestureLabel| seen.push(label);
///     observer.on_gesture(GestureLabel::Away);
/// }
/// assert_eq!(seen, vec![GestureLabel::Away]);
/// ```
pub trait GestureObserver: Send {
    /// Handle the label produced by the latest tick.
    fn on_gesture(&mut self, label: GestureLabel);
}

impl<F> GestureObserver for F
where
    F: FnMut(GestureLabel) + Send,
{
    fn on_gesture(&mut self, label: GestureLabel) {
        self(label);
    }
}

/// Observer that drops every label. Used when no UI is attached.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullObserver;

impl GestureObserver for NullObserver {
    fn on_gesture(&mut self, _label: GestureLabel) {}
}
