use crate::finder::ToiletFinder;
use crate::toilets::SearchRadius;

pub struct AppState<G, T> {
    pub finder: ToiletFinder<G, T>,
    pub default_radius: SearchRadius,
}
