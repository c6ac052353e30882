use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

use tripline_core::email;
use tripline_core::error::{WorkflowError, WorkflowResult};
use tripline_core::identity::Identity;
use tripline_core::notify::NotificationDispatcher;
use tripline_core::repository::{TokenRepository, TripRepository};
use tripline_core::token::{DriverToken, InvalidationReason};
use tripline_core::trip::{DriverChange, Trip, TripStatus};

use crate::token::{TokenManager, TOKEN_TTL_DAYS};
use crate::transition::TransitionEngine;

/// A driver's answer to an assignment.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    Accept,
    Reject,
}

#[derive(Debug)]
pub struct AssignmentOutcome {
    pub trip: Trip,
    pub token: DriverToken,
    /// Advisory only: notification failures never fail the assignment.
    pub warnings: Vec<String>,
}

#[derive(Debug)]
pub struct ResponseOutcome {
    pub trip: Trip,
    pub warnings: Vec<String>,
}

#[derive(Debug)]
pub struct CancellationOutcome {
    pub trip: Trip,
    pub warnings: Vec<String>,
}

#[derive(Debug)]
pub struct ResendOutcome {
    pub token: DriverToken,
}

/// Orchestrates driver assignment: each public operation composes the
/// transition engine, the token manager and the notification dispatcher.
/// State mutations are the durable outcome; notifications are fire-and-
/// continue except where noted.
pub struct AssignmentCoordinator {
    trips: Arc<dyn TripRepository>,
    transitions: TransitionEngine,
    tokens: TokenManager,
    notifier: Arc<dyn NotificationDispatcher>,
    link_base_url: String,
}

impl AssignmentCoordinator {
    pub fn new(
        trips: Arc<dyn TripRepository>,
        token_repo: Arc<dyn TokenRepository>,
        notifier: Arc<dyn NotificationDispatcher>,
        link_base_url: String,
    ) -> Self {
        Self::with_token_ttl_days(trips, token_repo, notifier, link_base_url, TOKEN_TTL_DAYS)
    }

    pub fn with_token_ttl_days(
        trips: Arc<dyn TripRepository>,
        token_repo: Arc<dyn TokenRepository>,
        notifier: Arc<dyn NotificationDispatcher>,
        link_base_url: String,
        token_ttl_days: i64,
    ) -> Self {
        Self {
            transitions: TransitionEngine::new(trips.clone(), token_repo.clone()),
            tokens: TokenManager::with_ttl_days(token_repo, trips.clone(), token_ttl_days),
            trips,
            notifier,
            link_base_url,
        }
    }

    /// Owner assigns (or reassigns) a driver: defuse the previous driver's
    /// links, issue-or-reuse a token for the new driver, move the trip to
    /// PENDING with the driver set in the same write, then send the magic
    /// link.
    pub async fn assign_driver(
        &self,
        trip_id: Uuid,
        new_driver_email: &str,
        actor: &Identity,
    ) -> WorkflowResult<AssignmentOutcome> {
        let trip = self.load_owned_trip(trip_id, actor, "assign a driver").await?;

        let driver_email = email::normalize(new_driver_email);
        if !email::is_valid(&driver_email) {
            return Err(WorkflowError::Validation(format!(
                "Invalid driver email: {}",
                driver_email
            )));
        }

        if trip.status == TripStatus::Cancelled {
            return Err(WorkflowError::InvalidState(
                "Trip has been cancelled".to_string(),
            ));
        }
        if trip.status == TripStatus::Confirmed && trip.driver.is_some() {
            return Err(WorkflowError::InvalidState(
                "Trip is already confirmed with a driver; unconfirm it first".to_string(),
            ));
        }

        let mut warnings = Vec::new();

        // Snapshot before any mutation: the unassignment recipient comes
        // from pre-transition state.
        let previous_driver = trip.driver.clone();
        if let Some(previous) = previous_driver.as_deref() {
            if previous != driver_email {
                self.tokens
                    .invalidate(trip_id, previous, InvalidationReason::DriverChanged)
                    .await?;
                if trip.status == TripStatus::Pending {
                    // The previous driver had not responded yet; let them
                    // know the request is withdrawn.
                    if let Err(err) = self
                        .notifier
                        .send(
                            previous,
                            "Trip assignment withdrawn",
                            &format!(
                                "The owner has assigned trip {} to another driver. \
                                 No action is needed on your side.",
                                trip_id
                            ),
                        )
                        .await
                    {
                        tracing::warn!(trip_id = %trip_id, error = %err, "Unassignment notification failed");
                        warnings.push("Could not notify the previous driver".to_string());
                    }
                }
            }
        }

        let token = self.tokens.issue_or_reuse(trip_id, &driver_email).await?;

        // Reassignment while already PENDING is a driver swap, not a status
        // change, so it does not go through the transition table.
        let updated = if trip.status == TripStatus::Pending {
            self.trips
                .apply_transition(
                    trip_id,
                    TripStatus::Pending,
                    TripStatus::Pending,
                    DriverChange::Assign(driver_email.clone()),
                )
                .await?
                .ok_or_else(|| {
                    WorkflowError::Conflict(format!("Trip {} changed status concurrently", trip_id))
                })?
        } else {
            self.transitions
                .transition_with_driver(
                    trip_id,
                    TripStatus::Pending,
                    DriverChange::Assign(driver_email.clone()),
                )
                .await?
        };

        let link = self.magic_link(trip_id, &token.token);
        if let Err(err) = self
            .notifier
            .send(
                &driver_email,
                "You have a new trip assignment",
                &format!(
                    "You have been assigned a trip. Accept or decline here:\n{}\n\
                     The link is valid until {}.",
                    link, token.expires_at
                ),
            )
            .await
        {
            tracing::warn!(trip_id = %trip_id, error = %err, "Assignment notification failed");
            warnings.push("Could not deliver the assignment notification".to_string());
        }

        Ok(AssignmentOutcome {
            trip: updated,
            token,
            warnings,
        })
    }

    /// Driver answers through the magic link. Accept confirms the trip;
    /// reject clears the driver alongside the REJECTED write. The token is
    /// consumed after the committed transition; notification failures never
    /// roll the transition back.
    pub async fn respond(
        &self,
        trip_id: Uuid,
        token_value: &str,
        decision: Decision,
    ) -> WorkflowResult<ResponseOutcome> {
        let validation = self.tokens.validate(trip_id, token_value).await?;
        if !validation.can_act {
            return Err(WorkflowError::Forbidden(
                "This trip is no longer awaiting a response.".to_string(),
            ));
        }

        let trip = self
            .trips
            .get_trip(trip_id)
            .await?
            .ok_or_else(|| WorkflowError::NotFound(format!("Trip {}", trip_id)))?;
        let owner = trip.owner_id.clone();
        let driver_email = validation.driver_email.clone();

        let mut warnings = Vec::new();
        let updated = match decision {
            Decision::Accept => {
                let updated = self
                    .transitions
                    .transition(trip_id, TripStatus::Confirmed)
                    .await?;
                self.tokens.consume(validation.token_id).await?;

                if let Err(err) = self
                    .notifier
                    .send(
                        &driver_email,
                        "Trip confirmed",
                        &format!("You have accepted trip {}. See you there.", trip_id),
                    )
                    .await
                {
                    tracing::warn!(trip_id = %trip_id, error = %err, "Driver confirmation notification failed");
                    warnings.push("Could not deliver the driver confirmation".to_string());
                }
                if let Err(err) = self
                    .notifier
                    .send(
                        &owner,
                        "Driver accepted your trip",
                        &format!("The driver has accepted trip {}.", trip_id),
                    )
                    .await
                {
                    tracing::warn!(trip_id = %trip_id, error = %err, "Owner notification failed");
                    warnings.push("Could not notify the trip owner".to_string());
                }
                updated
            }
            Decision::Reject => {
                let updated = self
                    .transitions
                    .transition_with_driver(trip_id, TripStatus::Rejected, DriverChange::Clear)
                    .await?;
                self.tokens.consume(validation.token_id).await?;

                if let Err(err) = self
                    .notifier
                    .send(
                        &owner,
                        "Driver declined your trip",
                        &format!(
                            "The driver has declined trip {}. You can assign another driver.",
                            trip_id
                        ),
                    )
                    .await
                {
                    tracing::warn!(trip_id = %trip_id, error = %err, "Owner notification failed");
                    warnings.push("Could not notify the trip owner".to_string());
                }
                updated
            }
        };

        Ok(ResponseOutcome {
            trip: updated,
            warnings,
        })
    }

    /// Backward-compatible email confirmation. Weaker trust than the token
    /// path: a bare case-insensitive email match with no token bookkeeping.
    pub async fn legacy_confirm(&self, trip_id: Uuid, driver_email: &str) -> WorkflowResult<Trip> {
        let trip = self
            .trips
            .get_trip(trip_id)
            .await?
            .ok_or_else(|| WorkflowError::NotFound(format!("Trip {}", trip_id)))?;

        let driver_email = email::normalize(driver_email);
        let assigned = trip.driver.as_deref().unwrap_or_default();
        if !assigned.eq_ignore_ascii_case(&driver_email) {
            return Err(WorkflowError::Forbidden(
                "Email does not match the assigned driver".to_string(),
            ));
        }
        if trip.status != TripStatus::Pending {
            return Err(WorkflowError::InvalidState(
                "Trip is not awaiting confirmation".to_string(),
            ));
        }

        tracing::warn!(trip_id = %trip_id, "Legacy email-based confirmation used");
        self.transitions.transition(trip_id, TripStatus::Confirmed).await
    }

    /// Owner cancels the trip. The driver to notify is captured before the
    /// transition clears the column.
    pub async fn cancel_trip(
        &self,
        trip_id: Uuid,
        actor: &Identity,
    ) -> WorkflowResult<CancellationOutcome> {
        let trip = self.load_owned_trip(trip_id, actor, "cancel the trip").await?;

        let previous_driver = trip.driver.clone();
        let updated = self
            .transitions
            .transition(trip_id, TripStatus::Cancelled)
            .await?;

        let mut warnings = Vec::new();
        if let Some(driver) = previous_driver {
            if let Err(err) = self
                .notifier
                .send(
                    &driver,
                    "Trip cancelled",
                    &format!("Trip {} has been cancelled by the owner.", trip_id),
                )
                .await
            {
                tracing::warn!(trip_id = %trip_id, error = %err, "Cancellation notification failed");
                warnings.push("Could not notify the assigned driver".to_string());
            }
        }

        Ok(CancellationOutcome {
            trip: updated,
            warnings,
        })
    }

    /// Re-send the magic link to the currently assigned driver. Reuses the
    /// live token, never minting a fresh secret while one is valid. This is
    /// the one mandatory notification: delivery failure is the operation's
    /// failure.
    pub async fn resend_link(
        &self,
        trip_id: Uuid,
        actor: &Identity,
    ) -> WorkflowResult<ResendOutcome> {
        let trip = self.load_owned_trip(trip_id, actor, "re-send the link").await?;

        let Some(driver_email) = trip.driver.clone() else {
            return Err(WorkflowError::InvalidState(
                "No driver is assigned to this trip".to_string(),
            ));
        };
        if trip.status != TripStatus::Pending {
            return Err(WorkflowError::InvalidState(
                "Trip is not awaiting a driver response".to_string(),
            ));
        }

        let token = self.tokens.issue_or_reuse(trip_id, &driver_email).await?;
        let link = self.magic_link(trip_id, &token.token);
        self.notifier
            .send(
                &driver_email,
                "Reminder: trip assignment awaiting your response",
                &format!(
                    "You have a pending trip assignment. Accept or decline here:\n{}\n\
                     The link is valid until {}.",
                    link, token.expires_at
                ),
            )
            .await?;

        Ok(ResendOutcome { token })
    }

    async fn load_owned_trip(
        &self,
        trip_id: Uuid,
        actor: &Identity,
        action: &str,
    ) -> WorkflowResult<Trip> {
        let trip = self
            .trips
            .get_trip(trip_id)
            .await?
            .ok_or_else(|| WorkflowError::NotFound(format!("Trip {}", trip_id)))?;
        if trip.owner_id != actor.id {
            return Err(WorkflowError::Forbidden(format!(
                "Only the trip owner can {}",
                action
            )));
        }
        Ok(trip)
    }

    fn magic_link(&self, trip_id: Uuid, token_value: &str) -> String {
        format!(
            "{}/trips/{}/respond?token={}",
            self.link_base_url.trim_end_matches('/'),
            trip_id,
            token_value
        )
    }
}
