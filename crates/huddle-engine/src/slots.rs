//! Seat table: which participant occupies which seat, and in what role.
//!
//! [`SlotTable`] grows on demand up to its physical capacity. Vacated
//! seats keep their index (a vacant entry) so that seat indices, and the
//! mailboxes aligned with them, stay stable while a session runs.
//!
//! # Seat assignment
//!
//! Without an explicit index, a new participant takes the lowest-indexed
//! vacant seat; only when no seat is vacant does the table grow. Re-use
//! of freed seats is therefore deterministic.

use huddle_core::{ParticipantId, Role, SeatIndex, SlotError};

/// A seated participant.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Occupant {
    /// Participant identity.
    pub id: ParticipantId,
    /// Human or autonomous.
    pub role: Role,
}

/// Fixed-capacity mapping from seat index to occupant.
#[derive(Clone, Debug)]
pub struct SlotTable {
    seats: Vec<Option<Occupant>>,
    capacity: usize,
    max_occupants: usize,
}

impl SlotTable {
    /// Create an empty table with `capacity` physical seats of which at
    /// most `max_occupants` may be filled at once.
    ///
    /// `max_occupants` is clamped to `capacity`.
    pub fn new(capacity: usize, max_occupants: usize) -> Self {
        Self {
            seats: Vec::with_capacity(capacity),
            capacity,
            max_occupants: max_occupants.min(capacity),
        }
    }

    /// Seat a participant.
    ///
    /// Uses `seat` if given, otherwise the lowest vacant seat, otherwise a
    /// new seat at the end of the table.
    ///
    /// # Errors
    ///
    /// - [`SlotError::CapacityExceeded`] when the table is full.
    /// - [`SlotError::DuplicateParticipant`] when `id` is already seated.
    /// - [`SlotError::SeatOutOfRange`] / [`SlotError::SeatOccupied`] for a
    ///   bad explicit index.
    pub fn add(
        &mut self,
        id: ParticipantId,
        role: Role,
        seat: Option<SeatIndex>,
    ) -> Result<SeatIndex, SlotError> {
        if self.is_full() {
            return Err(SlotError::CapacityExceeded {
                max: self.max_occupants,
            });
        }
        if self.seat_of(&id).is_some() {
            return Err(SlotError::DuplicateParticipant { id });
        }

        let index = match seat {
            Some(seat) => {
                if seat.0 >= self.capacity {
                    return Err(SlotError::SeatOutOfRange {
                        seat,
                        capacity: self.capacity,
                    });
                }
                if self.occupant(seat).is_some() {
                    return Err(SlotError::SeatOccupied { seat });
                }
                seat.0
            }
            None => match self.next_vacant() {
                Some(vacant) => vacant.0,
                None => {
                    return Err(SlotError::CapacityExceeded {
                        max: self.max_occupants,
                    })
                }
            },
        };

        if index >= self.seats.len() {
            self.seats.resize(index + 1, None);
        }
        self.seats[index] = Some(Occupant { id, role });
        Ok(SeatIndex(index))
    }

    /// Vacate the seat held by `id`.
    ///
    /// Returns the vacated seat and the role it held, or `None` if `id`
    /// was not seated.
    pub fn remove(&mut self, id: &ParticipantId) -> Option<(SeatIndex, Role)> {
        let seat = self.seat_of(id)?;
        let occupant = self.seats[seat.0].take()?;
        Some((seat, occupant.role))
    }

    /// Seat an automatic [`add`](Self::add) would assign, ignoring the
    /// occupancy limit.
    pub fn next_vacant(&self) -> Option<SeatIndex> {
        match self.seats.iter().position(Option::is_none) {
            Some(vacant) => Some(SeatIndex(vacant)),
            None if self.seats.len() < self.capacity => Some(SeatIndex(self.seats.len())),
            None => None,
        }
    }

    /// Seat held by `id`, if any.
    pub fn seat_of(&self, id: &ParticipantId) -> Option<SeatIndex> {
        self.seats
            .iter()
            .position(|s| s.as_ref().is_some_and(|o| &o.id == id))
            .map(SeatIndex)
    }

    /// Occupant of `seat`, if any.
    pub fn occupant(&self, seat: SeatIndex) -> Option<&Occupant> {
        self.seats.get(seat.0).and_then(Option::as_ref)
    }

    /// All seats in index order, vacant ones included.
    pub fn seats(&self) -> impl Iterator<Item = (SeatIndex, Option<&Occupant>)> {
        self.seats
            .iter()
            .enumerate()
            .map(|(i, s)| (SeatIndex(i), s.as_ref()))
    }

    /// Occupied seats in index order.
    pub fn occupants(&self) -> impl Iterator<Item = (SeatIndex, &Occupant)> {
        self.seats
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_ref().map(|o| (SeatIndex(i), o)))
    }

    /// Role of every seat, `None` for vacant seats.
    pub fn roles(&self) -> Vec<Option<Role>> {
        self.seats
            .iter()
            .map(|s| s.as_ref().map(|o| o.role))
            .collect()
    }

    /// Number of non-vacant seats.
    pub fn occupant_count(&self) -> usize {
        self.seats.iter().filter(|s| s.is_some()).count()
    }

    /// Number of seated humans.
    pub fn human_count(&self) -> usize {
        self.occupants().filter(|(_, o)| o.role.is_human()).count()
    }

    /// Whether the occupancy limit has been reached.
    pub fn is_full(&self) -> bool {
        self.occupant_count() >= self.max_occupants
    }

    /// Whether no seat is occupied.
    pub fn is_empty(&self) -> bool {
        self.occupant_count() == 0
    }

    /// Length of the seat table (vacant seats included).
    pub fn len(&self) -> usize {
        self.seats.len()
    }

    /// Physical seat capacity.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Occupancy limit.
    pub fn max_occupants(&self) -> usize {
        self.max_occupants
    }
}
