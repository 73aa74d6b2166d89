mod gtfs;
mod observations;
