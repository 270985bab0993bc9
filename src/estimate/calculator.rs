use super::{
    Actuals, ActualsComparison, AreaEstimate, Estimate, EstimateArea, EstimateInputs,
    BRAND_FUND_RATE, GALLONS_PER_SET, ROYALTY_RATE, SALES_COMMISSION_RATE,
};

/// Gallons and material cost for a single area.
pub fn area_estimate(area: &EstimateArea) -> AreaEstimate {
    let covered = area.covered_area();
    let board_feet = covered * area.thickness();
    let gallons = board_feet / area.foam_type.board_feet_per_set() * GALLONS_PER_SET;
    let material_cost = area.set_price() / GALLONS_PER_SET * gallons;

    AreaEstimate {
        area_type: area.area_type,
        foam_type: area.foam_type,
        area: covered,
        gallons,
        material_cost,
    }
}

pub fn calculate(inputs: &EstimateInputs) -> Estimate {
    let areas: Vec<AreaEstimate> = inputs.areas.iter().map(area_estimate).collect();

    let total_area: f64 = areas.iter().map(|a| a.area).sum();
    let total_gallons: f64 = areas.iter().map(|a| a.gallons).sum();
    let total_material_cost: f64 = areas.iter().map(|a| a.material_cost).sum();

    let base_labor_cost = inputs.manual_rate * inputs.manual_hours;
    let fuel_cost = inputs.travel_distance * inputs.fuel_cost_per_mile;
    let marked_up_material = total_material_cost * (1.0 + inputs.material_markup / 100.0);
    let marked_up_labor = base_labor_cost * (1.0 + inputs.labor_markup / 100.0);

    let pass_through = inputs.waste_cost + inputs.equipment_cost + fuel_cost;
    let total_base_cost = total_material_cost + base_labor_cost + pass_through;
    let total_before_discount =
        (marked_up_material + marked_up_labor + pass_through) * inputs.complexity;
    let revenue = total_before_discount * (1.0 - inputs.discount / 100.0);

    let royalty = revenue * ROYALTY_RATE;
    let brand_fund = revenue * BRAND_FUND_RATE;
    let sales_commission = revenue * SALES_COMMISSION_RATE;
    let total_fees = royalty + brand_fund + sales_commission;

    let profit = revenue - total_fees - total_base_cost;
    let profit_margin = if revenue == 0.0 {
        None
    } else {
        Some(profit / revenue * 100.0).filter(|m| m.is_finite())
    };

    let actuals = inputs.actuals.as_ref().map(|actuals| {
        compare_actuals(
            actuals,
            total_gallons,
            total_material_cost,
            inputs.manual_rate,
            base_labor_cost,
        )
    });

    Estimate {
        areas,
        total_area,
        total_gallons,
        total_material_cost,
        base_labor_cost,
        marked_up_material,
        marked_up_labor,
        fuel_cost,
        total_base_cost,
        total_before_discount,
        revenue,
        royalty,
        brand_fund,
        sales_commission,
        total_fees,
        profit,
        profit_margin,
        actuals,
    }
}

fn compare_actuals(
    actuals: &Actuals,
    est_gallons: f64,
    est_material_cost: f64,
    est_rate: f64,
    est_labor_cost: f64,
) -> ActualsComparison {
    let cost_per_gallon = est_material_cost / est_gallons;
    let cost_per_gallon = if cost_per_gallon.is_finite() {
        cost_per_gallon
    } else {
        0.0
    };
    let actual_material_cost = actuals.actual_gallons * cost_per_gallon;

    let rate = if actuals.actual_manual_rate > 0.0 {
        actuals.actual_manual_rate
    } else {
        est_rate
    };
    let actual_labor_cost = actuals.actual_manual_hours * rate;

    ActualsComparison {
        actual_gallons: actuals.actual_gallons,
        actual_material_cost,
        actual_labor_cost,
        material_variance: actual_material_cost - est_material_cost,
        labor_variance: actual_labor_cost - est_labor_cost,
    }
}
