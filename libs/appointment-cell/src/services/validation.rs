// libs/appointment-cell/src/services/validation.rs
use tracing::{debug, info};
use uuid::Uuid;

use crate::models::{
    hhmm, BookingError, CheckOutcome, EntityKind, EntitySummary, Named, Professional, Resolution, Service,
    TimeRange, ValidationChecks, ValidationRequest, ValidationResult,
};
use crate::services::availability::AvailabilityService;
use crate::services::conflict::has_conflict;
use crate::services::slots::{slot_labels, SlotGenerator};

/// Answers "is this (service, professional, date, time) bookable right now?"
/// without writing anything. Sub-checks never short-circuit each other.
#[derive(Clone)]
pub struct BookingValidator {
    availability: AvailabilityService,
}

struct Lookup<T> {
    outcome: CheckOutcome,
    found: Option<T>,
    suggestions: Vec<String>,
}

impl<T> Lookup<T> {
    fn not_checked() -> Self {
        Self { outcome: CheckOutcome::NotChecked, found: None, suggestions: Vec::new() }
    }
}

fn names<T: Named>(items: &[T]) -> Vec<String> {
    items.iter().map(|item| item.name().to_string()).collect()
}

impl BookingValidator {
    pub fn new(availability: AvailabilityService) -> Self {
        Self { availability }
    }

    pub async fn validate(&self, business_id: Uuid, request: ValidationRequest) -> Result<ValidationResult, BookingError> {
        let date = request.date.unwrap_or_else(|| self.availability.clock().today());
        debug!("Validating booking request for business {} on {}", business_id, date);

        let service = self.check_service(business_id, &request.service).await?;
        let professional = match request.professional.as_deref().map(str::trim) {
            Some(reference) if !reference.is_empty() => self.check_professional(business_id, reference).await?,
            _ => Lookup::not_checked(),
        };

        let mut issues = Vec::new();
        if request.service.trim().is_empty() {
            issues.push(BookingError::MissingField("service").to_string());
        } else if service.outcome == CheckOutcome::Invalid {
            issues.push(
                BookingError::NotFound {
                    entity: EntityKind::Service,
                    reference: request.service.trim().to_string(),
                    suggestions: service.suggestions.clone(),
                }
                .to_string(),
            );
        }
        if professional.outcome == CheckOutcome::Invalid {
            issues.push(
                BookingError::NotFound {
                    entity: EntityKind::Professional,
                    reference: request.professional.clone().unwrap_or_default().trim().to_string(),
                    suggestions: professional.suggestions.clone(),
                }
                .to_string(),
            );
        }

        let mut availability = CheckOutcome::NotChecked;
        let mut available_slots = Vec::new();

        match &professional.found {
            Some(found_professional) => {
                let calendar = self.availability.calendar(business_id).await?;
                let limits = calendar.day_limits(date);
                let is_open = calendar.is_open(date);
                let busy = if is_open {
                    self.availability.busy_ranges(business_id, found_professional.id, date, None).await?
                } else {
                    Vec::new()
                };

                let interval = self.availability.booking_interval();
                let duration = service
                    .found
                    .as_ref()
                    .map(|s| s.duration_minutes as i64)
                    .unwrap_or(interval as i64);
                if is_open {
                    available_slots = slot_labels(&SlotGenerator::new(interval).generate(&limits, duration, &busy));
                }

                match (&service.found, request.time) {
                    (Some(found_service), Some(time)) => {
                        let range = TimeRange::starting_at(date.and_time(time), found_service.duration_minutes as i64)
                            .ok_or_else(|| BookingError::InvalidInput(format!("Date {} is out of range", date)))?;
                        availability = if !is_open {
                            issues.push(format!("The business is closed on {}", date));
                            CheckOutcome::Invalid
                        } else if !limits.contains(&range) {
                            issues.push(format!(
                                "The time {} is outside business hours ({}-{})",
                                hhmm::format(&time),
                                hhmm::format(&limits.open.time()),
                                hhmm::format(&limits.close.time())
                            ));
                            CheckOutcome::Invalid
                        } else if has_conflict(&range, &busy) {
                            issues.push(format!(
                                "{} is already booked at {}",
                                found_professional.name,
                                hhmm::format(&time)
                            ));
                            CheckOutcome::Invalid
                        } else {
                            CheckOutcome::Valid
                        };
                    }
                    (Some(_), None) => issues.push("No time was given, so availability was not checked".to_string()),
                    (None, _) => {}
                }
            }
            None if professional.outcome == CheckOutcome::NotChecked => {
                issues.push("No professional was given, so availability was not checked".to_string());
            }
            None => {}
        }

        let checks = ValidationChecks {
            service: service.outcome,
            professional: professional.outcome,
            availability,
        };
        let valid = checks.all_valid();

        let message = match (valid, &service.found, &professional.found, request.time) {
            (true, Some(s), Some(p), Some(time)) => {
                format!("{} with {} on {} at {} is available", s.name, p.name, date, hhmm::format(&time))
            }
            _ => {
                if !available_slots.is_empty() {
                    issues.push(format!("Available times: {}", available_slots.join(", ")));
                } else if professional.found.is_some() {
                    issues.push("There are no available times on this date".to_string());
                }
                issues.join(". ")
            }
        };

        info!(
            "Validation for business {}: service={:?} professional={:?} availability={:?}",
            business_id, checks.service, checks.professional, checks.availability
        );

        Ok(ValidationResult {
            valid,
            service_valid: checks.service.is_valid(),
            professional_valid: checks.professional.is_valid(),
            availability_valid: checks.availability.is_valid(),
            checks,
            service: service.found.as_ref().map(EntitySummary::of),
            professional: professional.found.as_ref().map(EntitySummary::of),
            date,
            time: request.time.as_ref().map(hhmm::format),
            service_suggestions: service.suggestions,
            professional_suggestions: professional.suggestions,
            available_slots,
            message,
        })
    }

    async fn check_service(&self, business_id: Uuid, reference: &str) -> Result<Lookup<Service>, BookingError> {
        Ok(match self.availability.resolver().resolve_service(business_id, reference).await? {
            Resolution::Canonical(found) | Resolution::ExactMatch(found) => Lookup {
                outcome: CheckOutcome::Valid,
                found: Some(found),
                suggestions: Vec::new(),
            },
            Resolution::SubstringMatch { primary, candidates } => Lookup {
                outcome: CheckOutcome::Valid,
                found: Some(primary),
                suggestions: names(&candidates),
            },
            Resolution::NoMatch { suggestions } => Lookup {
                outcome: CheckOutcome::Invalid,
                found: None,
                suggestions: names(&suggestions),
            },
        })
    }

    async fn check_professional(&self, business_id: Uuid, reference: &str) -> Result<Lookup<Professional>, BookingError> {
        Ok(match self.availability.resolver().resolve_professional(business_id, reference).await? {
            Resolution::Canonical(found) | Resolution::ExactMatch(found) => Lookup {
                outcome: CheckOutcome::Valid,
                found: Some(found),
                suggestions: Vec::new(),
            },
            Resolution::SubstringMatch { primary, candidates } => Lookup {
                outcome: CheckOutcome::Valid,
                found: Some(primary),
                suggestions: names(&candidates),
            },
            Resolution::NoMatch { .. } => {
                let everyone = self.availability.professional_alternatives(business_id).await?;
                Lookup {
                    outcome: CheckOutcome::Invalid,
                    found: None,
                    suggestions: names(&everyone),
                }
            }
        })
    }
}
