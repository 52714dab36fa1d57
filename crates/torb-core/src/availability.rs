// Availability resolution
//
// Turns an event row, the seat list and the event's active reservations
// into an EventView. Remaining counts are always derived here from the
// reservations; no stored counter is consulted.

use std::collections::{BTreeMap, HashMap};

use crate::event::{EventRecord, EventView, SheetView, SheetsView};
use crate::reservation::ReservationRecord;
use crate::sheet::Sheet;

/// Resolve at most one active reservation per seat.
///
/// A seat should never carry two active reservations. If the store ever
/// returns more than one, the earliest `reserved_at` wins, then the lowest id.
pub fn winning_reservations(
    reservations: &[ReservationRecord],
) -> HashMap<i64, &ReservationRecord> {
    let mut winners: HashMap<i64, &ReservationRecord> = HashMap::new();
    for reservation in reservations.iter().filter(|r| r.is_active()) {
        winners
            .entry(reservation.sheet_id)
            .and_modify(|current| {
                if (reservation.reserved_at, reservation.id) < (current.reserved_at, current.id) {
                    *current = reservation;
                }
            })
            .or_insert(reservation);
    }
    winners
}

/// Build the availability view of an event.
///
/// `viewer` is the logged-in user, if any; only that user's seats are
/// flagged `mine`. Seat detail follows (rank, number) order.
pub fn resolve_event(
    event: &EventRecord,
    sheets: &[Sheet],
    reservations: &[ReservationRecord],
    viewer: Option<i64>,
) -> EventView {
    let viewer = viewer.filter(|id| *id > 0);
    let winners = winning_reservations(reservations);

    let mut ordered: Vec<&Sheet> = sheets.iter().collect();
    ordered.sort_by_key(|s| s.order_key());

    let mut groups: BTreeMap<_, SheetsView> = BTreeMap::new();
    let mut total = 0;
    let mut reserved_count = 0;

    for sheet in ordered {
        let group = groups.entry(sheet.rank).or_default();
        group.price = event.price + sheet.price;
        group.total += 1;
        total += 1;

        let view = match winners.get(&sheet.id) {
            Some(reservation) => {
                reserved_count += 1;
                group.remains -= 1;
                SheetView {
                    num: sheet.num,
                    mine: viewer == Some(reservation.user_id),
                    reserved: true,
                    reserved_at: Some(reservation.reserved_at.timestamp()),
                }
            }
            None => SheetView {
                num: sheet.num,
                mine: false,
                reserved: false,
                reserved_at: None,
            },
        };
        group.detail.push(view);
    }

    // remains accumulated as -reserved; shift by totals
    for group in groups.values_mut() {
        group.remains += group.total;
    }

    EventView {
        id: event.id,
        title: event.title.clone(),
        public: event.public,
        closed: event.closed,
        price: event.price,
        total,
        remains: total - reserved_count,
        sheets: groups,
    }
}
