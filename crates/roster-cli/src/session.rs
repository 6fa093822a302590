//! Capture-to-save pipeline.
//!
//! State lives in explicit session values instead of ambient fields:
//! a [`CaptureSession`] owns the camera stream and the descriptor taken
//! with it, and a [`Registration`] carries the looked-up player through to
//! the final write. Dropping either releases whatever it holds.

use crate::error::RosterError;
use roster_core::{
    Descriptor, DescriptorExtractor, EuclideanMatcher, MatchResult, Matcher, ModelGate,
    PlayerRecord,
};
use roster_hw::{open_with_fallback, ActiveStream, Camera, FrameStream};
use roster_store::PlayerStore;

/// Trimmed, non-empty player ID.
pub fn validate_id(id: &str) -> Result<String, RosterError> {
    let id = id.trim();
    if id.is_empty() {
        return Err(RosterError::EmptyId);
    }
    Ok(id.to_string())
}

/// Grab one frame from `stream` and turn it into a descriptor.
async fn describe<S: FrameStream, E: DescriptorExtractor>(
    stream: &mut ActiveStream<S>,
    gate: &ModelGate<E>,
) -> Result<Descriptor, RosterError> {
    let frame = stream.next_frame()?;
    if frame.is_dark {
        tracing::warn!(
            brightness = frame.avg_brightness(),
            "frame is very dark; face detection may fail"
        );
    }
    Ok(gate.acquire(&frame.data, frame.width, frame.height).await?)
}

/// An open capture surface for one player.
pub struct CaptureSession<S: FrameStream> {
    player_id: String,
    stream: ActiveStream<S>,
    descriptor: Option<Descriptor>,
}

impl<S: FrameStream> CaptureSession<S> {
    /// Validate the ID, then acquire the camera. An empty ID never reaches
    /// the camera.
    pub fn open<C>(player_id: &str, camera: &C) -> Result<Self, RosterError>
    where
        C: Camera<Stream = S>,
    {
        let player_id = validate_id(player_id)?;
        let stream = open_with_fallback(camera)?;
        tracing::debug!(id = %player_id, "capture session opened");
        Ok(Self {
            player_id,
            stream,
            descriptor: None,
        })
    }

    /// Take a photo and keep its descriptor, replacing any earlier one.
    /// On failure the previous descriptor is kept.
    pub async fn take_photo<E: DescriptorExtractor>(
        &mut self,
        gate: &ModelGate<E>,
    ) -> Result<&Descriptor, RosterError> {
        let descriptor = describe(&mut self.stream, gate).await?;
        tracing::info!(id = %self.player_id, dim = descriptor.len(), "photo captured");
        Ok(&*self.descriptor.insert(descriptor))
    }

    /// Release the camera, handing back the descriptor if a photo was taken.
    pub fn close(self) -> Option<Descriptor> {
        self.descriptor
    }

    /// Standalone "save photo": store the descriptor for this player,
    /// keeping the year of an existing record.
    pub async fn save_photo(self, store: &PlayerStore) -> Result<PlayerRecord, RosterError> {
        let Self {
            player_id,
            stream,
            descriptor,
        } = self;
        drop(stream);

        let descriptor = descriptor.ok_or_else(|| RosterError::NoPhoto(player_id.clone()))?;
        let year = store.get(&player_id).await?.and_then(|r| r.year);
        let record = PlayerRecord {
            id: player_id,
            year,
            facial_descriptor: Some(descriptor),
        };
        store.put(&record).await?;
        Ok(record)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RegistrationOutcome {
    Registered(PlayerRecord),
    Updated(PlayerRecord),
}

impl RegistrationOutcome {
    pub fn record(&self) -> &PlayerRecord {
        match self {
            Self::Registered(r) | Self::Updated(r) => r,
        }
    }
}

/// Registration of one player, from ID lookup to the final write.
pub struct Registration {
    player_id: String,
    existing: Option<PlayerRecord>,
    descriptor: Option<Descriptor>,
}

impl Registration {
    /// Look the ID up. An existing player's stored descriptor is carried
    /// over, so re-registering does not require a new photo.
    pub async fn begin(store: &PlayerStore, player_id: &str) -> Result<Self, RosterError> {
        let player_id = validate_id(player_id)?;
        let existing = store.get(&player_id).await?;
        let descriptor = existing
            .as_ref()
            .and_then(|r| r.facial_descriptor.clone());
        Ok(Self {
            player_id,
            existing,
            descriptor,
        })
    }

    pub fn player_id(&self) -> &str {
        &self.player_id
    }

    pub fn existing(&self) -> Option<&PlayerRecord> {
        self.existing.as_ref()
    }

    pub fn is_update(&self) -> bool {
        self.existing.is_some()
    }

    pub fn has_photo(&self) -> bool {
        self.descriptor.is_some()
    }

    /// Open the camera, take one photo, release the camera.
    pub async fn capture<C, E>(&mut self, camera: &C, gate: &ModelGate<E>) -> Result<(), RosterError>
    where
        C: Camera,
        E: DescriptorExtractor,
    {
        let mut session = CaptureSession::open(&self.player_id, camera)?;
        session.take_photo(gate).await?;
        self.descriptor = session.close();
        Ok(())
    }

    /// Write the player. `year` falls back to the existing record's year.
    pub async fn submit(
        self,
        store: &PlayerStore,
        year: Option<i32>,
    ) -> Result<RegistrationOutcome, RosterError> {
        let descriptor = self
            .descriptor
            .ok_or_else(|| RosterError::NoPhoto(self.player_id.clone()))?;
        let year = year.or_else(|| self.existing.as_ref().and_then(|r| r.year));
        let record = PlayerRecord {
            id: self.player_id,
            year,
            facial_descriptor: Some(descriptor),
        };
        store.put(&record).await?;

        Ok(if self.existing.is_some() {
            RegistrationOutcome::Updated(record)
        } else {
            RegistrationOutcome::Registered(record)
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VerifyOutcome {
    pub matched: bool,
    pub distance: f32,
}

/// Compare a fresh photo against the stored descriptor of `player_id`.
pub async fn verify<C, E>(
    store: &PlayerStore,
    player_id: &str,
    camera: &C,
    gate: &ModelGate<E>,
) -> Result<VerifyOutcome, RosterError>
where
    C: Camera,
    E: DescriptorExtractor,
{
    let player_id = validate_id(player_id)?;
    let record = store
        .get(&player_id)
        .await?
        .ok_or_else(|| RosterError::UnknownPlayer(player_id.clone()))?;
    let stored = record
        .facial_descriptor
        .ok_or_else(|| RosterError::NoStoredPhoto(player_id.clone()))?;

    let mut session = CaptureSession::open(&player_id, camera)?;
    let probe = session.take_photo(gate).await?.clone();
    drop(session);

    let distance = probe.distance(&stored)?;
    let matched = probe.is_match(&stored)?;
    tracing::info!(id = %player_id, distance, matched, "verify");
    Ok(VerifyOutcome { matched, distance })
}

/// Find the registered player closest to the face in a fresh photo.
pub async fn identify<C, E>(
    store: &PlayerStore,
    camera: &C,
    gate: &ModelGate<E>,
    threshold: f32,
) -> Result<MatchResult, RosterError>
where
    C: Camera,
    E: DescriptorExtractor,
{
    let probe = {
        let mut stream = open_with_fallback(camera)?;
        describe(&mut stream, gate).await?
    };
    let gallery = store.get_all().await?;
    let result = EuclideanMatcher.compare(&probe, &gallery, threshold);
    tracing::info!(
        gallery = gallery.len(),
        matched = result.matched,
        distance = ?result.distance,
        "identify"
    );
    Ok(result)
}
